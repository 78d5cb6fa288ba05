#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_rs::{ByteOrder, Command, PayloadFormat};

fuzz_target!(|data: &[u8]| {
    let commands = [
        Command::new(3, 0, PayloadFormat::Register).with_decimals(2),
        Command::new(3, 0, PayloadFormat::Registers).with_registers(4),
        Command::new(4, 0, PayloadFormat::Long).with_byte_order(ByteOrder::LittleSwap),
        Command::new(3, 0, PayloadFormat::Float).with_registers(4),
        Command::new(3, 0, PayloadFormat::String).with_registers(3),
        Command::new(1, 0, PayloadFormat::Bits).with_bits(13),
        Command::new(2, 0, PayloadFormat::Bit),
    ];
    for command in &commands {
        let _ = command.parse_response(data);
    }
});
