//! Typed values to and from their raw native byte representation.
//!
//! The wire contract of the dispatch engine is "native widths, native
//! byte order, no padding": a value occupies exactly `SIZE` contiguous
//! bytes laid out the way this device represents it in memory. This
//! crate is the only place that layout knowledge lives; everything above
//! it manipulates byte slices and typed values, never raw memory.

#![no_std]

/// A value with a fixed raw representation on the wire.
///
/// `SIZE` is the declared byte width of the type. Arguments of a command
/// are packed back to back at cumulative `SIZE` offsets, in declaration
/// order.
pub trait Wire: Copy {
    /// Byte width of the raw representation.
    const SIZE: usize;

    /// Decode a value from the first `SIZE` bytes of `raw`.
    fn from_wire(raw: &[u8]) -> Self;

    /// Encode the value into the first `SIZE` bytes of `dst`.
    fn to_wire(self, dst: &mut [u8]);
}

/// A value a callback may return over the wire.
///
/// Everything `Wire` qualifies, plus `()` for callbacks that produce no
/// response (zero bytes written back).
pub trait WireReturn: Copy {
    /// Byte width of the raw representation; `0` for `()`.
    const SIZE: usize;

    /// Encode the value into the first `SIZE` bytes of `dst`.
    fn to_wire(self, dst: &mut [u8]);
}

impl<T: Wire> WireReturn for T {
    const SIZE: usize = <T as Wire>::SIZE;

    fn to_wire(self, dst: &mut [u8]) {
        <T as Wire>::to_wire(self, dst);
    }
}

impl WireReturn for () {
    const SIZE: usize = 0;

    fn to_wire(self, _dst: &mut [u8]) {}
}

macro_rules! impl_number {
    ($TYPE:ty) => {
        impl Wire for $TYPE {
            // NOTE: a wrong size here is a compile-time error
            // (array length mismatch), not UB
            const SIZE: usize = core::mem::size_of::<$TYPE>();

            fn from_wire(raw: &[u8]) -> Self {
                let mut bytes = [0; <Self as Wire>::SIZE];
                bytes.copy_from_slice(&raw[..<Self as Wire>::SIZE]);

                // ne_bytes: the wire carries this device's
                // native representation
                Self::from_ne_bytes(bytes)
            }

            fn to_wire(self, dst: &mut [u8]) {
                dst[..<Self as Wire>::SIZE].copy_from_slice(&self.to_ne_bytes());
            }
        }
    };
}

// number impls

impl_number!(u8);
impl_number!(u16);
impl_number!(u32);
impl_number!(u64);
impl_number!(i8);
impl_number!(i16);
impl_number!(i32);
impl_number!(i64);
impl_number!(f32);
impl_number!(f64);

// pointer-width integers carry addresses for the raw memory
// access commands, so unlike the sized numbers their wire
// width varies by platform
impl_number!(usize);
impl_number!(isize);

// bool impls

impl Wire for bool {
    const SIZE: usize = 1;

    fn from_wire(raw: &[u8]) -> Self {
        raw[0] != 0
    }

    fn to_wire(self, dst: &mut [u8]) {
        dst[0] = if self { 1 } else { 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! round_trip {
        ($TYPE:ty) => {
            let mut buf = [0u8; 16];

            // introduce some basic value differences
            let test_num = <$TYPE>::MAX / (0xa as $TYPE);

            Wire::to_wire(test_num, &mut buf);
            let read_num = <$TYPE>::from_wire(&buf);

            assert_eq!(test_num, read_num);
        };
    }

    #[test]
    fn numbers() {
        round_trip!(u8);
        round_trip!(u16);
        round_trip!(u32);
        round_trip!(u64);
        round_trip!(i8);
        round_trip!(i16);
        round_trip!(i32);
        round_trip!(i64);
        round_trip!(f32);
        round_trip!(f64);
        round_trip!(usize);
        round_trip!(isize);
    }

    #[test]
    fn bool_values() {
        let mut buf = [0u8; 1];

        for val in [false, true] {
            Wire::to_wire(val, &mut buf);
            assert_eq!(val, bool::from_wire(&buf));
        }

        // any non-zero byte reads back as true
        assert!(bool::from_wire(&[0xff]));
    }

    #[test]
    fn native_layout() {
        let mut buf = [0u8; 2];

        Wire::to_wire(0x1234u16, &mut buf);

        assert_eq!(0x1234u16.to_ne_bytes(), buf);

        // all tested targets are little-endian
        #[cfg(target_endian = "little")]
        assert_eq!([0x34, 0x12], buf);
    }

    #[test]
    fn void_return() {
        let mut buf = [0xaau8; 4];

        assert_eq!(0, <() as WireReturn>::SIZE);
        ().to_wire(&mut buf);

        // untouched
        assert_eq!([0xaa; 4], buf);
    }
}
