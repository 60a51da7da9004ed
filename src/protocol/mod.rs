//! Message model and OSC wire format

pub mod message;
pub mod wire;

pub use message::{encode, OutboundMessage, Payload, MESSAGES_PER_SNAPSHOT};
pub use wire::{decode_datagram, encode_batch, BoolEncoding, FloatWidth, WireMode, WireOptions};
