//! Per-call dispatch context.
//!
//! A [`Frame`] lives for exactly one dispatch cycle: it exposes the
//! collected argument block to the handler and stages the handler's
//! return bytes until the dispatcher flushes them to the port.

use bytecast::Wire;
use heapless::Vec;

use crate::builtins::Hal;
use crate::RET_CAP;

pub mod error {
    /// The staged reply outgrew the return-capture slot.
    #[derive(Debug, Clone, Copy)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct ReplyOverflow;
}

/// Transient state for one in-flight call.
///
/// Created by the dispatcher when all argument bytes have been
/// collected, handed to the handler, discarded when the cycle ends.
pub struct Frame<'a> {
    id: u8,
    args: &'a [u8],
    // right-to-left argument cursor, see `take_arg`
    cursor: usize,
    device_id: u8,
    hal: &'a mut dyn Hal,
    reply: Vec<u8, RET_CAP>,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(id: u8, args: &'a [u8], device_id: u8, hal: &'a mut dyn Hal) -> Self {
        Self {
            id,
            args,
            cursor: args.len(),
            device_id,
            hal,
            reply: Vec::new(),
        }
    }

    /// Id of the command being dispatched.
    pub fn command(&self) -> u8 {
        self.id
    }

    /// This device's configured identity byte.
    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    /// The raw argument block, exactly as received.
    pub fn args(&self) -> &[u8] {
        self.args
    }

    pub fn hal(&mut self) -> &mut dyn Hal {
        &mut *self.hal
    }

    /// Pull one typed argument, consuming declared arguments in
    /// **right-to-left** order: the first call returns the rightmost
    /// declared argument.
    ///
    /// This order mirrors the calling convention the trampolines mimic
    /// and is deliberate, documented behavior; handlers written
    /// directly against the dispatcher rely on it. Returns `None` once
    /// the block is exhausted (or was never large enough).
    pub fn take_arg<T: Wire>(&mut self) -> Option<T> {
        let start = self.cursor.checked_sub(T::SIZE)?;
        let value = T::from_wire(&self.args[start..]);
        self.cursor = start;

        Some(value)
    }

    /// Decode one typed argument at a byte offset into the block,
    /// without touching the right-to-left cursor.
    pub fn arg_at<T: Wire>(&self, offset: usize) -> Option<T> {
        let end = offset.checked_add(T::SIZE)?;

        (end <= self.args.len()).then(|| T::from_wire(&self.args[offset..]))
    }

    /// Stage raw return bytes for the remote caller.
    ///
    /// Bytes are written to the port in the order given, with no
    /// framing, once the handler returns.
    pub fn return_value(&mut self, raw: &[u8]) -> Result<(), error::ReplyOverflow> {
        self.reply
            .extend_from_slice(raw)
            .map_err(|()| error::ReplyOverflow)
    }

    /// CRC-8 over the id byte followed by the argument block.
    ///
    /// The dispatch loop never verifies this; integrity checking is an
    /// explicit, opt-in step for handlers whose callers append a
    /// checksum byte to the payload.
    pub fn checksum(&self) -> u8 {
        let mut digest = crate::crc8::CRC8.digest();
        digest.update(&[self.id]);
        digest.update(self.args);
        digest.finalize()
    }

    pub(crate) fn finish(self) -> Vec<u8, RET_CAP> {
        self.reply
    }
}
