//! CRC-8 checksum over a byte block.
//!
//! Polynomial 0x31, initial value 0xFF, no input or output reflection
//! (the catalog's CRC-8/NRSC-5). The dispatch engine never verifies
//! checksums itself; callers that want payload integrity checksum the
//! id + argument block explicitly, e.g. via [`Frame::checksum`].
//!
//! [`Frame::checksum`]: crate::frame::Frame::checksum

use crc::{Crc, CRC_8_NRSC_5};

pub(crate) const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// Compute the CRC-8 of a byte block.
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::crc8;

    #[test]
    fn known_vectors() {
        // empty input leaves the initial value untouched
        assert_eq!(0xff, crc8(&[]));

        // catalog check value for CRC-8/NRSC-5
        assert_eq!(0xf7, crc8(b"123456789"));
    }

    #[test]
    fn deterministic() {
        let data = [0xde, 0xad, 0xbe, 0xef];

        assert_eq!(crc8(&data), crc8(&data));
    }

    #[test]
    fn bit_sensitive() {
        assert_ne!(crc8(&[0x00]), crc8(&[0x01]));

        // flipping any single bit of a block changes the checksum
        let data = [0xa5, 0x3c, 0x00, 0xff];
        let reference = crc8(&data);

        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data;
                flipped[byte] ^= 1 << bit;

                assert_ne!(reference, crc8(&flipped));
            }
        }
    }
}
