//! The built-in command set and its hardware port.
//!
//! Remote callers depend on these commands sitting at stable ids, so
//! [`Dispatcher::load_default_set`](crate::Dispatcher::load_default_set)
//! registers them in a fixed, documented order (see that method).
//!
//! Hardware access goes through the [`Hal`] port trait; the engine
//! never touches pins itself. Argument blocks are fixed-width per the
//! wire contract: each handler decodes its fields from the front of the
//! block and treats any remaining declared bytes as reserved. Decoding
//! is bounds-checked, so a block too short for a handler's fields makes
//! that command a no-op rather than anything worse.

use bytecast::Wire;

use crate::frame::Frame;

/// Hardware operations the built-in command set forwards to.
///
/// Every method defaults to a no-op (reads return zero), so an
/// integration implements only what its hardware offers. [`NullHal`]
/// is the all-default implementation for hosts with no hardware at all.
#[allow(unused_variables)]
pub trait Hal {
    fn pin_mode(&mut self, pin: u8, mode: u8) {}

    fn digital_write(&mut self, pin: u16, value: u8) {}

    fn analog_write(&mut self, pin: u16, value: u16) {}

    fn digital_read(&mut self, pin: u16) -> u8 {
        0
    }

    fn analog_read(&mut self, pin: u16) -> u16 {
        0
    }

    fn analog_reference(&mut self, mode: u8) {}

    fn tone(&mut self, pin: u8, frequency: u16, duration_ms: u32) {}

    fn no_tone(&mut self, pin: u8) {}

    fn shift_out(&mut self, data_pin: u8, clock_pin: u8, bit_order: u8, value: u8) {}

    fn shift_in(&mut self, data_pin: u8, clock_pin: u8, bit_order: u8) -> u8 {
        0
    }
}

/// A [`Hal`] that does nothing. Useful on hosts and in tests.
pub struct NullHal;

impl Hal for NullHal {}

/// Identifies this firmware build; the device-type introspection
/// command returns this string's address.
pub static DEVICE_TYPE: &[u8] = b"stream-call\0";

pub(crate) mod handlers {
    use super::*;

    pub fn pin_mode(frame: &mut Frame<'_>) {
        let (Some(pin), Some(mode)) = (frame.arg_at::<u8>(0), frame.arg_at::<u8>(1)) else {
            return;
        };
        frame.hal().pin_mode(pin, mode);
    }

    pub fn digital_write(frame: &mut Frame<'_>) {
        let (Some(pin), Some(value)) = (frame.arg_at::<u16>(0), frame.arg_at::<u8>(2)) else {
            return;
        };
        frame.hal().digital_write(pin, value);
    }

    pub fn analog_write(frame: &mut Frame<'_>) {
        let (Some(pin), Some(value)) = (frame.arg_at::<u16>(0), frame.arg_at::<u16>(2)) else {
            return;
        };
        frame.hal().analog_write(pin, value);
    }

    pub fn digital_read(frame: &mut Frame<'_>) {
        let Some(pin) = frame.arg_at::<u16>(0) else {
            return;
        };
        let value = frame.hal().digital_read(pin);
        let _ = frame.return_value(&[value]);
    }

    pub fn analog_read(frame: &mut Frame<'_>) {
        let Some(pin) = frame.arg_at::<u16>(0) else {
            return;
        };
        let value = frame.hal().analog_read(pin);

        let mut raw = [0u8; 2];
        value.to_wire(&mut raw);
        let _ = frame.return_value(&raw);
    }

    pub fn analog_reference(frame: &mut Frame<'_>) {
        let Some(mode) = frame.arg_at::<u8>(0) else {
            return;
        };
        frame.hal().analog_reference(mode);
    }

    pub fn tone(frame: &mut Frame<'_>) {
        let (Some(pin), Some(frequency), Some(duration_ms)) = (
            frame.arg_at::<u8>(0),
            frame.arg_at::<u16>(1),
            frame.arg_at::<u32>(3),
        ) else {
            return;
        };
        frame.hal().tone(pin, frequency, duration_ms);
    }

    pub fn no_tone(frame: &mut Frame<'_>) {
        let Some(pin) = frame.arg_at::<u8>(0) else {
            return;
        };
        frame.hal().no_tone(pin);
    }

    pub fn shift_out(frame: &mut Frame<'_>) {
        let (Some(data_pin), Some(clock_pin), Some(bit_order), Some(value)) = (
            frame.arg_at::<u8>(0),
            frame.arg_at::<u8>(1),
            frame.arg_at::<u8>(2),
            frame.arg_at::<u8>(3),
        ) else {
            return;
        };
        frame.hal().shift_out(data_pin, clock_pin, bit_order, value);
    }

    pub fn shift_in(frame: &mut Frame<'_>) {
        let (Some(data_pin), Some(clock_pin), Some(bit_order)) = (
            frame.arg_at::<u8>(0),
            frame.arg_at::<u8>(1),
            frame.arg_at::<u8>(2),
        ) else {
            return;
        };
        let value = frame.hal().shift_in(data_pin, clock_pin, bit_order);
        let _ = frame.return_value(&[value]);
    }

    // Raw memory access. The wire protocol hands the remote caller the
    // device's whole address space; addresses are used exactly as
    // given, in this device's pointer width.

    pub fn peek_byte(frame: &mut Frame<'_>) {
        let Some(addr) = frame.arg_at::<usize>(0) else {
            return;
        };
        // SAFETY: address supplied by the remote caller, who the wire
        // contract trusts with raw memory access
        let value = unsafe { core::ptr::read_volatile(addr as *const u8) };
        let _ = frame.return_value(&[value]);
    }

    pub fn peek_word(frame: &mut Frame<'_>) {
        let Some(addr) = frame.arg_at::<usize>(0) else {
            return;
        };
        // SAFETY: as for `peek_byte`
        let value = unsafe { core::ptr::read_volatile(addr as *const u16) };

        let mut raw = [0u8; 2];
        value.to_wire(&mut raw);
        let _ = frame.return_value(&raw);
    }

    pub fn peek_dword(frame: &mut Frame<'_>) {
        let Some(addr) = frame.arg_at::<usize>(0) else {
            return;
        };
        // SAFETY: as for `peek_byte`
        let value = unsafe { core::ptr::read_volatile(addr as *const u32) };

        let mut raw = [0u8; 4];
        value.to_wire(&mut raw);
        let _ = frame.return_value(&raw);
    }

    pub fn poke_byte(frame: &mut Frame<'_>) {
        let (Some(addr), Some(value)) = (
            frame.arg_at::<usize>(0),
            frame.arg_at::<u8>(usize::SIZE),
        ) else {
            return;
        };
        // SAFETY: as for `peek_byte`
        unsafe { core::ptr::write_volatile(addr as *mut u8, value) };
    }

    pub fn poke_word(frame: &mut Frame<'_>) {
        let (Some(addr), Some(value)) = (
            frame.arg_at::<usize>(0),
            frame.arg_at::<u16>(usize::SIZE),
        ) else {
            return;
        };
        // SAFETY: as for `peek_byte`
        unsafe { core::ptr::write_volatile(addr as *mut u16, value) };
    }

    pub fn poke_dword(frame: &mut Frame<'_>) {
        let (Some(addr), Some(value)) = (
            frame.arg_at::<usize>(0),
            frame.arg_at::<u32>(usize::SIZE),
        ) else {
            return;
        };
        // SAFETY: as for `peek_byte`
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) };
    }

    pub fn device_type_addr(frame: &mut Frame<'_>) {
        let addr = DEVICE_TYPE.as_ptr() as usize;

        let mut raw = [0u8; core::mem::size_of::<usize>()];
        addr.to_wire(&mut raw);
        let _ = frame.return_value(&raw);
    }

    pub fn device_id(frame: &mut Frame<'_>) {
        let id = frame.device_id();
        let _ = frame.return_value(&[id]);
    }
}
