//! Generic dispatch trampolines.
//!
//! The command table is uniform: every entry stores the same
//! `fn(&mut Frame, Erased)` handler shape plus an erased pointer to the
//! original callback. The bridge between that uniform shape and an
//! arbitrary native signature is a *trampoline*: one monomorphized
//! adapter per distinct `fn(A1..An) -> R` signature, generated at
//! compile time by the [`Callable`] impls below. Commands sharing a
//! signature share a trampoline; there is no runtime type tag anywhere.
//!
//! This module is the only place callback pointers are erased and
//! restored. Soundness rests on a single pairing invariant: the table
//! stores an erased pointer exclusively next to the trampoline produced
//! by the same `Callable` impl, so the `transmute` inside each
//! trampoline always restores the exact type that was erased.

use bytecast::{Wire, WireReturn};

use crate::frame::Frame;
use crate::RET_CAP;

/// An original callback with its signature erased. Restored only by the
/// matching trampoline.
pub type Erased = *const ();

/// Uniform entry point stored in the command table.
pub type Handler = fn(&mut Frame<'_>, Erased);

/// A handler written directly against the dispatcher instead of
/// wrapping a native function. Pulls its own arguments from the frame
/// (typically via [`Frame::take_arg`]) and stages its own reply.
pub type RawHandler = fn(&mut Frame<'_>);

pub(crate) fn raw_trampoline(frame: &mut Frame<'_>, callback: Erased) {
    // SAFETY: `callback` was erased from a `RawHandler` by
    // `Dispatcher::register`, the only producer of entries carrying
    // this trampoline
    let callback = unsafe { core::mem::transmute::<Erased, RawHandler>(callback) };

    callback(frame);
}

/// A native function registrable through the typed facade.
///
/// Implemented for `fn` pointers of arity 0–4 whose arguments are
/// [`Wire`] and whose return type is [`WireReturn`]. The declared
/// argument size is the sum of the argument byte widths, computed at
/// compile time.
pub trait Callable: Copy {
    /// Total declared argument bytes on the wire.
    const ARGS_SIZE: usize;
    /// Byte width of the return value; `0` for none.
    const RET_SIZE: usize;

    /// Erase the callback for storage in the uniform table.
    fn erase(self) -> Erased;

    /// The trampoline specialized to this signature.
    fn trampoline() -> Handler;
}

impl<R: WireReturn> Callable for fn() -> R {
    const ARGS_SIZE: usize = 0;
    const RET_SIZE: usize = R::SIZE;

    fn erase(self) -> Erased {
        self as Erased
    }

    fn trampoline() -> Handler {
        |frame, callback| {
            // SAFETY: pairing invariant, see module docs
            let callback = unsafe { core::mem::transmute::<Erased, Self>(callback) };

            let ret = callback();

            if R::SIZE > 0 {
                let mut raw = [0u8; RET_CAP];
                ret.to_wire(&mut raw);
                let _ = frame.return_value(&raw[..R::SIZE]);
            }
        }
    }
}

macro_rules! impl_callable {
    ( $(($TYPE:ident, $NAME:ident)),+ ) => {
        impl<R: WireReturn, $($TYPE: Wire),+> Callable for fn($($TYPE),+) -> R {
            const ARGS_SIZE: usize = 0 $(+ $TYPE::SIZE)+;
            const RET_SIZE: usize = R::SIZE;

            fn erase(self) -> Erased {
                self as Erased
            }

            fn trampoline() -> Handler {
                |frame, callback| {
                    // SAFETY: pairing invariant, see module docs
                    let callback =
                        unsafe { core::mem::transmute::<Erased, Self>(callback) };

                    // arguments sit at cumulative offsets in
                    // declaration order
                    let mut offset = 0;
                    $(
                        let Some($NAME) = frame.arg_at::<$TYPE>(offset) else {
                            return;
                        };
                        offset += $TYPE::SIZE;
                    )+
                    let _ = offset;

                    let ret = callback($($NAME),+);

                    if R::SIZE > 0 {
                        let mut raw = [0u8; RET_CAP];
                        ret.to_wire(&mut raw);
                        let _ = frame.return_value(&raw[..R::SIZE]);
                    }
                }
            }
        }
    };
}

impl_callable!((A1, a1));
impl_callable!((A1, a1), (A2, a2));
impl_callable!((A1, a1), (A2, a2), (A3, a3));
impl_callable!((A1, a1), (A2, a2), (A3, a3), (A4, a4));

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::builtins::NullHal;

    #[test]
    fn declared_sizes() {
        assert_eq!(0, <fn() -> u8 as Callable>::ARGS_SIZE);
        assert_eq!(3, <fn(u16, u8) -> u8 as Callable>::ARGS_SIZE);
        assert_eq!(8, <fn(u8, u16, u8, u32) as Callable>::ARGS_SIZE);

        assert_eq!(0, <fn(u8) as Callable>::RET_SIZE);
        assert_eq!(4, <fn() -> f32 as Callable>::RET_SIZE);
    }

    #[test]
    fn zero_args_with_return() {
        fn forty_two() -> u8 {
            42
        }

        let callback = forty_two as fn() -> u8;

        let mut hal = NullHal;
        let mut frame = Frame::new(0, &[], 0, &mut hal);

        (<fn() -> u8 as Callable>::trampoline())(&mut frame, callback.erase());

        assert_eq!(&[42u8][..], frame.finish().as_slice());
    }

    #[test]
    fn two_args_left_to_right() {
        static GOT: AtomicU32 = AtomicU32::new(0);

        fn record(a: u16, b: u8) -> u8 {
            GOT.store(((a as u32) << 8) | b as u32, Ordering::Relaxed);
            b
        }

        let callback = record as fn(u16, u8) -> u8;

        let mut raw = [0u8; 3];
        raw[..2].copy_from_slice(&0x1234u16.to_ne_bytes());
        raw[2] = 0x07;

        let mut hal = NullHal;
        let mut frame = Frame::new(5, &raw, 0, &mut hal);

        (<fn(u16, u8) -> u8 as Callable>::trampoline())(&mut frame, callback.erase());

        assert_eq!(0x1234_07, GOT.load(Ordering::Relaxed));
        assert_eq!(&[0x07u8][..], frame.finish().as_slice());
    }

    #[test]
    fn four_args_offsets() {
        static GOT: AtomicU32 = AtomicU32::new(0);

        fn record(a: u8, b: u16, c: u8, d: u32) {
            GOT.store(a as u32 + b as u32 + c as u32 + d, Ordering::Relaxed);
        }

        let callback = record as fn(u8, u16, u8, u32);

        let mut raw = [0u8; 8];
        raw[0] = 1;
        raw[1..3].copy_from_slice(&0x0100u16.to_ne_bytes());
        raw[3] = 2;
        raw[4..8].copy_from_slice(&0x0002_0000u32.to_ne_bytes());

        let mut hal = NullHal;
        let mut frame = Frame::new(0, &raw, 0, &mut hal);

        (<fn(u8, u16, u8, u32) as Callable>::trampoline())(&mut frame, callback.erase());

        assert_eq!(0x0002_0103, GOT.load(Ordering::Relaxed));
        // void return stages nothing
        assert!(frame.finish().is_empty());
    }

    #[test]
    fn raw_handler_round_trip() {
        fn echo_first(frame: &mut Frame<'_>) {
            let Some(byte) = frame.arg_at::<u8>(0) else {
                return;
            };
            let _ = frame.return_value(&[byte]);
        }

        let raw = [0xabu8];

        let mut hal = NullHal;
        let mut frame = Frame::new(0, &raw, 0, &mut hal);

        raw_trampoline(&mut frame, (echo_first as RawHandler) as Erased);

        assert_eq!(&[0xabu8][..], frame.finish().as_slice());
    }
}
