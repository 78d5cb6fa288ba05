//! The payload module turns domain values into request payloads and response
//! payloads back into values.

pub mod codec;
pub mod command;

pub use codec::ByteOrder;
pub use command::{Command, PayloadFormat, Value, WriteValue};
