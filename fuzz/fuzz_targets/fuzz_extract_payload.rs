#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_rs::modbus::frame::{extract_payload, TransmissionMode};

fuzz_target!(|data: &[u8]| {
    let Some((&function_code, response)) = data.split_first() else {
        return;
    };
    let function_code = (function_code & 0x7F).max(1);
    let _ = extract_payload(response, 1, TransmissionMode::Rtu, function_code);
    let _ = extract_payload(response, 1, TransmissionMode::Ascii, function_code);
});
