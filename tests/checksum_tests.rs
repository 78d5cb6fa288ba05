//! Checksum tests, cross-checked against the reference CRC catalogue.

use crc::{Crc, CRC_16_MODBUS};
use modbus_rs::modbus::checksum::{crc16, crc16_bitwise, crc16_bytes, lrc};
use proptest::prelude::*;

const REFERENCE: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Tests the documented check value of CRC-16/MODBUS.
#[test]
fn test_catalogue_check_value() {
    assert_eq!(crc16(b"123456789"), 0x4B37);
    assert_eq!(REFERENCE.checksum(b"123456789"), 0x4B37);
}

/// Tests the checksum of `02 07`, stored low byte first.
#[test]
fn test_low_byte_first() {
    assert_eq!(crc16(&[0x02, 0x07]), 0x1241);
    assert_eq!(crc16_bytes(&[0x02, 0x07]), [0x41, 0x12]);
}

/// Tests that appending the CRC yields a zero remainder.
#[test]
fn test_residue() {
    let mut frame = vec![0x01, 0x03, 0x02, 0x03, 0x02];
    frame.extend_from_slice(&crc16_bytes(&frame));
    assert_eq!(crc16(&frame), 0x0000);
}

/// Tests that the LRC makes the byte sum zero.
#[test]
fn test_lrc_sum_is_zero() {
    let data = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03];
    let sum = data
        .iter()
        .fold(lrc(&data), |acc, byte| acc.wrapping_add(*byte));
    assert_eq!(sum, 0);
    assert_eq!(lrc(&data), 0x7E);
}

proptest! {
    #[test]
    fn prop_matches_reference(data in proptest::collection::vec(any::<u8>(), 0..300)) {
        prop_assert_eq!(crc16(&data), REFERENCE.checksum(&data));
        prop_assert_eq!(crc16(&data), crc16_bitwise(&data));
    }

    #[test]
    fn prop_single_bit_flip_detected(
        data in proptest::collection::vec(any::<u8>(), 1..64),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut corrupted = data.clone();
        corrupted[index.index(data.len())] ^= 1 << bit;
        prop_assert_ne!(crc16(&data), crc16(&corrupted));
        prop_assert_ne!(lrc(&data), lrc(&corrupted));
    }
}
