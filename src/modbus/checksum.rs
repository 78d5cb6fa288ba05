//! Checksums for the two serial transmission modes.
//!
//! RTU frames end with a CRC-16 (polynomial 0xA001 reflected, preset 0xFFFF)
//! stored low byte first. ASCII frames end with an LRC: the two's complement of
//! the byte sum, sent as two uppercase hex characters.

const CRC16_POLYNOMIAL: u16 = 0xA001;

/// CRC lookup table, generated at compile time with the bit-serial algorithm.
static CRC16_TABLE: [u16; 256] = build_crc16_table();

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC16_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Modbus CRC-16 of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF, |crc, byte| {
        (crc >> 8) ^ CRC16_TABLE[usize::from((crc ^ u16::from(*byte)) as u8)]
    })
}

/// Modbus CRC-16 of `data`, computed one bit at a time.
///
/// Reference form of [`crc16`]; both produce identical output.
pub fn crc16_bitwise(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= u16::from(*byte);
        for _ in 0..8 {
            let carry = crc & 1 != 0;
            crc >>= 1;
            if carry {
                crc ^= CRC16_POLYNOMIAL;
            }
        }
    }
    crc
}

/// CRC as the two bytes appended to an RTU frame (low byte first).
pub fn crc16_bytes(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}

/// Longitudinal redundancy check of `data`.
pub fn lrc(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
        .wrapping_neg()
}

/// LRC as the two hex characters appended to an ASCII frame.
pub fn lrc_hex(data: &[u8]) -> String {
    format!("{:02X}", lrc(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_reference_value() {
        assert_eq!(crc16_bytes(&[0x02, 0x07]), [0x41, 0x12]);
    }

    #[test]
    fn test_crc_of_read_request() {
        let frame = [0x01, 0x03, 0x01, 0x21, 0x00, 0x01];
        assert_eq!(crc16_bytes(&frame), [0xD5, 0xFC]);
    }

    #[test]
    fn test_crc_empty_is_preset() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_table_matches_bitwise() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(crc16(&data), crc16_bitwise(&data));
        for byte in 0..=255u8 {
            assert_eq!(crc16(&[byte]), crc16_bitwise(&[byte]));
        }
    }

    #[test]
    fn test_crc_order_sensitive() {
        assert_ne!(crc16(&[0x01, 0x02]), crc16(&[0x02, 0x01]));
    }

    #[test]
    fn test_lrc() {
        // 01 03 00 00 00 01 -> sum 5 -> LRC FB
        assert_eq!(lrc(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0xFB);
        assert_eq!(lrc_hex(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), "FB");
        assert_eq!(lrc(&[]), 0x00);
        assert_eq!(lrc(&[0xFF, 0x01]), 0x00);
    }
}
