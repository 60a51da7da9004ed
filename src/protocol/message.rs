//! Transport snapshot to message mapping

use crate::transport::TransportSnapshot;

/// Number of messages produced per snapshot
pub const MESSAGES_PER_SNAPSHOT: usize = 7;

/// Message addresses, in emission order
pub mod address {
    pub const BPM: &str = "/BPM";
    pub const TIME_SIGN_NUMERATOR: &str = "/TIME-SIGN-NUMERATOR";
    pub const TIME_SIGN_DENOMINATOR: &str = "/TIME-SIGN-DENOMINATOR";
    pub const PPQ_POSITION: &str = "/PPQ-POSITION";
    pub const TIME_IN_SECONDS: &str = "/TIME-IN-SECONDS";
    pub const IS_PLAYING: &str = "/IS-PLAYING";
    pub const IS_RECORDING: &str = "/IS-RECORDING";

    pub const ALL: [&str; super::MESSAGES_PER_SNAPSHOT] = [
        BPM,
        TIME_SIGN_NUMERATOR,
        TIME_SIGN_DENOMINATOR,
        PPQ_POSITION,
        TIME_IN_SECONDS,
        IS_PLAYING,
        IS_RECORDING,
    ];
}

/// Single typed argument carried by a message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    Float(f64),
    Int(i32),
    Bool(bool),
}

impl Payload {
    /// Integer view: ints as-is, booleans as 0/1
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Payload::Int(v) => Some(v),
            Payload::Bool(b) => Some(b as i32),
            Payload::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Payload::Float(v) => Some(v),
            _ => None,
        }
    }
}

/// Address plus payload, produced fresh for every send cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutboundMessage {
    pub address: &'static str,
    pub payload: Payload,
}

impl OutboundMessage {
    pub const fn new(address: &'static str, payload: Payload) -> Self {
        Self { address, payload }
    }

    /// Address without the leading slash, e.g. `BPM`
    pub fn name(&self) -> &'static str {
        self.address.trim_start_matches('/')
    }
}

/// Turn a snapshot into its seven messages
///
/// Pure and allocation-free. Non-finite values are passed through as the
/// host reported them.
pub fn encode(snapshot: &TransportSnapshot) -> [OutboundMessage; MESSAGES_PER_SNAPSHOT] {
    [
        OutboundMessage::new(address::BPM, Payload::Float(snapshot.tempo_bpm)),
        OutboundMessage::new(address::TIME_SIGN_NUMERATOR, Payload::Int(snapshot.time_sig_numerator)),
        OutboundMessage::new(address::TIME_SIGN_DENOMINATOR, Payload::Int(snapshot.time_sig_denominator)),
        OutboundMessage::new(address::PPQ_POSITION, Payload::Float(snapshot.ppq_position)),
        OutboundMessage::new(address::TIME_IN_SECONDS, Payload::Float(snapshot.time_in_seconds)),
        OutboundMessage::new(address::IS_PLAYING, Payload::Bool(snapshot.is_playing)),
        OutboundMessage::new(address::IS_RECORDING, Payload::Bool(snapshot.is_recording)),
    ]
}
