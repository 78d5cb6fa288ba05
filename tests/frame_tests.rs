//! Tests for RTU and ASCII framing: building request frames and validating responses.

use modbus_rs::modbus::frame::{embed_payload, extract_payload, TransmissionMode};
use modbus_rs::util::hex::hex_to_bytes;
use modbus_rs::{ExceptionCode, ModbusError};
use proptest::prelude::*;

/// Tests the RTU frame for reading register 289.
#[test]
fn test_embed_rtu() {
    let frame = embed_payload(1, TransmissionMode::Rtu, 3, &[0x01, 0x21, 0x00, 0x01]).unwrap();
    assert_eq!(frame, hex_to_bytes("01 03 01 21 00 01 d5 fc"));
}

/// Tests the ASCII frame for reading register 0.
#[test]
fn test_embed_ascii() {
    let frame = embed_payload(1, TransmissionMode::Ascii, 3, &[0x00, 0x00, 0x00, 0x01]).unwrap();
    assert_eq!(frame, b":010300000001FB\r\n".to_vec());
}

/// Tests that function codes outside 1..=127 are rejected.
#[test]
fn test_embed_invalid_function_code() {
    for fc in [0u8, 0x80, 0xFF] {
        assert!(matches!(
            embed_payload(1, TransmissionMode::Rtu, fc, &[]),
            Err(ModbusError::InvalidArgument(_))
        ));
    }
}

/// Tests extracting the payload of a register read.
#[test]
fn test_extract_rtu() {
    let payload = extract_payload(
        &hex_to_bytes("01 03 02 03 02 39 75"),
        1,
        TransmissionMode::Rtu,
        3,
    )
    .unwrap();
    assert_eq!(payload, vec![0x02, 0x03, 0x02]);
}

/// Tests that every single-bit flip in the CRC is detected.
#[test]
fn test_crc_bit_flips() {
    let response = hex_to_bytes("01 03 02 03 02 39 75");
    for byte in 5..7 {
        for bit in 0..8 {
            let mut corrupted = response.clone();
            corrupted[byte] ^= 1 << bit;
            assert!(matches!(
                extract_payload(&corrupted, 1, TransmissionMode::Rtu, 3),
                Err(ModbusError::InvalidResponse(_))
            ));
        }
    }
}

/// Tests that responses below the minimum length are rejected in both modes.
#[test]
fn test_too_short() {
    assert!(extract_payload(&[0x01, 0x03, 0x02], 1, TransmissionMode::Rtu, 3).is_err());
    assert!(extract_payload(&b":0103FC\r\n"[..8], 1, TransmissionMode::Ascii, 3).is_err());
}

/// Tests a wrong function code in the response.
#[test]
fn test_wrong_function_code() {
    // Valid CRC, but function 4 answering a function 3 request
    let response = hex_to_bytes("01 04 02 00 64 b8 db");
    let err = extract_payload(&response, 1, TransmissionMode::Rtu, 3).unwrap_err();
    assert!(err.to_string().contains("function code"));
}

/// Tests exception decoding, including codes outside the standard table.
#[test]
fn test_exception_response() {
    let err = extract_payload(
        &hex_to_bytes("01 83 02 c0 f1"),
        1,
        TransmissionMode::Rtu,
        3,
    )
    .unwrap_err();
    assert_eq!(err.exception_code(), Some(ExceptionCode::IllegalDataAddress));

    let err = extract_payload(
        &hex_to_bytes("01 83 42 c1 01"),
        1,
        TransmissionMode::Rtu,
        3,
    )
    .unwrap_err();
    assert_eq!(err.exception_code(), Some(ExceptionCode::Unknown(0x42)));
}

/// Tests ASCII envelope problems.
#[test]
fn test_ascii_malformed() {
    let cases: [&[u8]; 4] = [
        b"010302012CCD\r\n\r\n",  // no start character
        b":010302012CCD\n\n",     // wrong terminator
        b":010302012CC\r\n",      // odd number of hex digits
        b":010302012CXD\r\n",     // not hex
    ];
    for case in cases {
        assert!(
            matches!(
                extract_payload(case, 1, TransmissionMode::Ascii, 3),
                Err(ModbusError::InvalidResponse(_))
            ),
            "accepted {:?}",
            case.escape_ascii().to_string()
        );
    }
}

/// Tests that a wrong LRC is detected.
#[test]
fn test_ascii_lrc_mismatch() {
    assert!(matches!(
        extract_payload(b":010302012CCE\r\n", 1, TransmissionMode::Ascii, 3),
        Err(ModbusError::InvalidResponse(_))
    ));
}

proptest! {
    #[test]
    fn prop_extract_inverts_embed_rtu(
        slave in 1u8..=247,
        fc in 1u8..=0x7F,
        payload in proptest::collection::vec(any::<u8>(), 2..64),
    ) {
        let frame = embed_payload(slave, TransmissionMode::Rtu, fc, &payload).unwrap();
        prop_assert_eq!(frame.len(), TransmissionMode::Rtu.frame_length(payload.len()));
        prop_assert_eq!(extract_payload(&frame, slave, TransmissionMode::Rtu, fc).unwrap(), payload);
    }

    #[test]
    fn prop_extract_inverts_embed_ascii(
        slave in 1u8..=247,
        fc in 1u8..=0x7F,
        payload in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let frame = embed_payload(slave, TransmissionMode::Ascii, fc, &payload).unwrap();
        prop_assert_eq!(frame.len(), TransmissionMode::Ascii.frame_length(payload.len()));
        prop_assert_eq!(extract_payload(&frame, slave, TransmissionMode::Ascii, fc).unwrap(), payload);
    }
}
