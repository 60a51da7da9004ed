//! OSC wire format
//!
//! Each [`OutboundMessage`] becomes an OSC message whose address is prefixed
//! with the routing id, e.g. `/main/BPM`. Messages go out one datagram each,
//! or grouped into a single immediate bundle per batch.

use rosc::{encoder, OscBundle, OscMessage, OscPacket, OscTime, OscType};
use serde::{Deserialize, Serialize};

use super::message::{OutboundMessage, Payload};
use crate::constants::MAX_PACKET_SIZE;
use crate::error::TransmitError;

/// How a batch is split into datagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireMode {
    /// One datagram per message
    #[default]
    PerMessage,
    /// One OSC bundle per batch, time tag "immediately"
    Bundle,
}

/// OSC type used for float payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FloatWidth {
    /// 32-bit `f`, understood by every receiver
    #[default]
    Single,
    /// 64-bit `d`
    Double,
}

/// OSC type used for boolean payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoolEncoding {
    /// `i` with 0 or 1
    #[default]
    Int,
    /// Native `T` / `F`
    Native,
}

/// Wire encoding options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireOptions {
    pub mode: WireMode,
    pub float_width: FloatWidth,
    pub bool_encoding: BoolEncoding,
}

/// Full OSC address for a message under a routing id
pub fn osc_address(routing_id: &str, message: &OutboundMessage) -> String {
    if routing_id.is_empty() {
        message.address.to_string()
    } else {
        format!("/{}{}", routing_id, message.address)
    }
}

/// OSC argument for a payload
pub fn osc_arg(payload: Payload, options: &WireOptions) -> OscType {
    match payload {
        Payload::Float(v) => match options.float_width {
            FloatWidth::Single => OscType::Float(v as f32),
            FloatWidth::Double => OscType::Double(v),
        },
        Payload::Int(v) => OscType::Int(v),
        Payload::Bool(b) => match options.bool_encoding {
            BoolEncoding::Int => OscType::Int(b as i32),
            BoolEncoding::Native => OscType::Bool(b),
        },
    }
}

fn to_packet(routing_id: &str, message: &OutboundMessage, options: &WireOptions) -> OscPacket {
    OscPacket::Message(OscMessage {
        addr: osc_address(routing_id, message),
        args: vec![osc_arg(message.payload, options)],
    })
}

fn encode_packet(packet: &OscPacket) -> Result<Vec<u8>, TransmitError> {
    let buf = encoder::encode(packet).map_err(|e| TransmitError::Encode(e.to_string()))?;
    if buf.len() > MAX_PACKET_SIZE {
        return Err(TransmitError::PacketTooLarge(buf.len()));
    }
    Ok(buf)
}

/// Serialize a batch into the datagrams to transmit, in order
pub fn encode_batch(
    messages: &[OutboundMessage],
    routing_id: &str,
    options: &WireOptions,
) -> Result<Vec<Vec<u8>>, TransmitError> {
    match options.mode {
        WireMode::PerMessage => messages
            .iter()
            .map(|m| encode_packet(&to_packet(routing_id, m, options)))
            .collect(),
        WireMode::Bundle => {
            if messages.is_empty() {
                return Ok(Vec::new());
            }
            let bundle = OscPacket::Bundle(OscBundle {
                // (0, 1) is the OSC "immediately" time tag
                timetag: OscTime::from((0, 1)),
                content: messages.iter().map(|m| to_packet(routing_id, m, options)).collect(),
            });
            Ok(vec![encode_packet(&bundle)?])
        }
    }
}

/// Decode a datagram into `(address, arguments)` pairs, flattening bundles
pub fn decode_datagram(buf: &[u8]) -> Result<Vec<(String, Vec<OscType>)>, TransmitError> {
    let (_, packet) = rosc::decoder::decode_udp(buf).map_err(|e| TransmitError::Encode(e.to_string()))?;
    let mut out = Vec::new();
    flatten(packet, &mut out);
    Ok(out)
}

fn flatten(packet: OscPacket, out: &mut Vec<(String, Vec<OscType>)>) {
    match packet {
        OscPacket::Message(msg) => out.push((msg.addr, msg.args)),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::encode;
    use crate::transport::TransportSnapshot;

    fn playing() -> TransportSnapshot {
        TransportSnapshot {
            ppq_position: 8.5,
            time_in_seconds: 4.25,
            is_playing: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_address_prefix() {
        let msg = encode(&playing())[0];
        assert_eq!(osc_address("main", &msg), "/main/BPM");
        assert_eq!(osc_address("", &msg), "/BPM");
    }

    #[test]
    fn test_per_message_datagrams() {
        let messages = encode(&playing());
        let datagrams = encode_batch(&messages, "main", &WireOptions::default()).unwrap();
        assert_eq!(datagrams.len(), 7);

        let decoded = decode_datagram(&datagrams[0]).unwrap();
        assert_eq!(decoded, vec![("/main/BPM".to_string(), vec![OscType::Float(120.0)])]);

        let decoded = decode_datagram(&datagrams[5]).unwrap();
        assert_eq!(decoded, vec![("/main/IS-PLAYING".to_string(), vec![OscType::Int(1)])]);
    }

    #[test]
    fn test_bundle_keeps_order() {
        let options = WireOptions {
            mode: WireMode::Bundle,
            float_width: FloatWidth::Double,
            bool_encoding: BoolEncoding::Native,
        };
        let messages = encode(&playing());
        let datagrams = encode_batch(&messages, "", &options).unwrap();
        assert_eq!(datagrams.len(), 1);

        let decoded = decode_datagram(&datagrams[0]).unwrap();
        let addrs: Vec<&str> = decoded.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(addrs, crate::protocol::message::address::ALL.to_vec());
        assert_eq!(decoded[3].1, vec![OscType::Double(8.5)]);
        assert_eq!(decoded[6].1, vec![OscType::Bool(false)]);
    }

    #[test]
    fn test_empty_bundle_sends_nothing() {
        let options = WireOptions { mode: WireMode::Bundle, ..Default::default() };
        assert!(encode_batch(&[], "main", &options).unwrap().is_empty());
    }
}
