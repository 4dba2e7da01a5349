//! Remote-execution wire messages and the TCP frame codec.

pub mod codec;
pub mod types;

pub use codec::JsonMessageCodec;
pub use types::{
    CommandData, CommandResultData, MessageKind, OpenConnectionData, OutputEntry, PongData,
    RemoteMessage, PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
