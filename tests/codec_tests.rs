//! Round-trip properties of the value codecs.

use modbus_rs::payload::codec::{
    decode_bits, decode_float, decode_long, decode_register, decode_registers, decode_text,
    encode_bits, encode_float, encode_long, encode_register, encode_registers, encode_text,
    from_twos_complement, to_twos_complement, ByteOrder,
};
use proptest::prelude::*;

fn byte_order() -> impl Strategy<Value = ByteOrder> {
    prop_oneof![
        Just(ByteOrder::Big),
        Just(ByteOrder::Little),
        Just(ByteOrder::BigSwap),
        Just(ByteOrder::LittleSwap),
    ]
}

/// Tests the four byte orders on the 32-bit value 0x01020304.
#[test]
fn test_byte_orders_on_wire() {
    let cases = [
        (ByteOrder::Big, [0x01, 0x02, 0x03, 0x04]),
        (ByteOrder::Little, [0x04, 0x03, 0x02, 0x01]),
        (ByteOrder::BigSwap, [0x02, 0x01, 0x04, 0x03]),
        (ByteOrder::LittleSwap, [0x03, 0x04, 0x01, 0x02]),
    ];
    for (order, wire) in cases {
        assert_eq!(encode_long(0x0102_0304, false, 2, order).unwrap(), wire.to_vec());
        assert_eq!(decode_long(&wire, false, order).unwrap(), 0x0102_0304);
    }
}

/// Tests signed register limits.
#[test]
fn test_signed_register_limits() {
    assert_eq!(encode_register(-32768.0, 0, true).unwrap(), [0x80, 0x00]);
    assert_eq!(encode_register(32767.0, 0, true).unwrap(), [0x7F, 0xFF]);
    assert!(encode_register(32768.0, 0, true).is_err());
    assert!(encode_register(-32769.0, 0, true).is_err());
    assert_eq!(decode_register(&[0xFF, 0xFF], 0, true).unwrap(), -1.0);
    assert_eq!(decode_register(&[0xFF, 0xFF], 0, false).unwrap(), 65535.0);
}

/// Tests that NaN and infinity survive float decoding.
#[test]
fn test_float_special_values() {
    assert!(decode_float(&[0x7F, 0xC0, 0x00, 0x00], ByteOrder::Big).unwrap().is_nan());
    assert_eq!(
        decode_float(&[0x7F, 0x80, 0x00, 0x00], ByteOrder::Big).unwrap(),
        f64::INFINITY
    );
    assert_eq!(
        encode_float(1e300, 2, ByteOrder::Big).unwrap(),
        vec![0x7F, 0x80, 0x00, 0x00]
    );
}

proptest! {
    #[test]
    fn prop_register_round_trip(raw in any::<u16>(), decimals in 0u8..=4) {
        let value = f64::from(raw) / 10f64.powi(i32::from(decimals));
        let bytes = encode_register(value, decimals, false).unwrap();
        // Scaling may lose the last unit through float truncation
        let decoded = decode_register(&bytes, decimals, false).unwrap();
        prop_assert!((decoded - value).abs() <= 1.5 / 10f64.powi(i32::from(decimals)));
    }

    #[test]
    fn prop_signed_register_round_trip(raw in any::<i16>()) {
        let bytes = encode_register(f64::from(raw), 0, true).unwrap();
        prop_assert_eq!(decode_register(&bytes, 0, true).unwrap(), f64::from(raw));
    }

    #[test]
    fn prop_long_round_trip(value in any::<i32>(), order in byte_order()) {
        let bytes = encode_long(i128::from(value), true, 2, order).unwrap();
        prop_assert_eq!(bytes.len(), 4);
        prop_assert_eq!(decode_long(&bytes, true, order).unwrap(), i128::from(value));
    }

    #[test]
    fn prop_unsigned_long_round_trip(value in any::<u32>(), order in byte_order()) {
        let bytes = encode_long(i128::from(value), false, 2, order).unwrap();
        prop_assert_eq!(decode_long(&bytes, false, order).unwrap(), i128::from(value));
    }

    #[test]
    fn prop_long64_round_trip(value in any::<i64>(), order in byte_order()) {
        let bytes = encode_long(i128::from(value), true, 4, order).unwrap();
        prop_assert_eq!(bytes.len(), 8);
        prop_assert_eq!(decode_long(&bytes, true, order).unwrap(), i128::from(value));
    }

    #[test]
    fn prop_unsigned_long64_round_trip(value in any::<u64>(), order in byte_order()) {
        let bytes = encode_long(i128::from(value), false, 4, order).unwrap();
        prop_assert_eq!(bytes.len(), 8);
        prop_assert_eq!(decode_long(&bytes, false, order).unwrap(), i128::from(value));
    }

    #[test]
    fn prop_float_round_trip(value in any::<f32>().prop_filter("finite", |v| v.is_finite()), order in byte_order()) {
        let bytes = encode_float(f64::from(value), 2, order).unwrap();
        prop_assert_eq!(decode_float(&bytes, order).unwrap(), f64::from(value));
    }

    #[test]
    fn prop_double_round_trip(value in any::<f64>().prop_filter("finite", |v| v.is_finite()), order in byte_order()) {
        let bytes = encode_float(value, 4, order).unwrap();
        prop_assert_eq!(decode_float(&bytes, order).unwrap(), value);
    }

    #[test]
    fn prop_byte_order_is_involution(bytes in proptest::collection::vec(any::<u8>(), 4..=4), order in byte_order()) {
        prop_assert_eq!(order.arrange(&order.arrange(&bytes)), bytes);
    }

    #[test]
    fn prop_text_round_trip(text in "[ -~]{0,20}", extra in 0u16..4) {
        let trimmed = text.trim_end_matches(' ').to_string();
        let registers = (text.len() as u16).div_ceil(2).max(1) + extra;
        let bytes = encode_text(&text, registers).unwrap();
        prop_assert_eq!(bytes.len(), 2 * usize::from(registers));
        prop_assert_eq!(decode_text(&bytes).unwrap(), trimmed);
    }

    #[test]
    fn prop_registers_round_trip(values in proptest::collection::vec(any::<u16>(), 1..125)) {
        prop_assert_eq!(decode_registers(&encode_registers(&values)).unwrap(), values);
    }

    #[test]
    fn prop_bits_round_trip(bits in proptest::collection::vec(0u8..=1, 1..200)) {
        let packed = encode_bits(&bits).unwrap();
        prop_assert_eq!(packed.len(), bits.len().div_ceil(8));
        prop_assert_eq!(decode_bits(&packed, bits.len() as u16).unwrap(), bits);
    }

    #[test]
    fn prop_twos_complement_round_trip(value in any::<i16>()) {
        let raw = to_twos_complement(i64::from(value), 16).unwrap();
        prop_assert!(raw <= 0xFFFF);
        prop_assert_eq!(from_twos_complement(raw, 16).unwrap(), i64::from(value));
    }
}
