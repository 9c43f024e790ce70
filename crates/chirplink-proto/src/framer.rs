//! Splits outbound messages into wire frames and classifies inbound ones.
//!
//! The single-frame fast path and the multi-frame chunked path share one
//! wire shape — a compact JSON object — discriminated purely by the value
//! of `cc`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chirplink_core::config::TransportConfig;
use chirplink_core::frame::Message;
use serde_json::{Map, Value};

/// The outcome of classifying one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// A negative-acknowledgement control frame naming missing chunk indices.
    Retx { id: String, missing: Vec<u32> },
    /// A complete, unchunked message.
    Single { message: Message },
    /// One piece of a chunked message.
    ChunkPiece {
        id: String,
        ci: u32,
        cc: u32,
        ct: String,
        /// Present only when `ci == 0`: the metadata keys carried on the
        /// first chunk.
        meta: Option<Map<String, Value>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    MissingId,
    IndexOutOfRange { ci: u32, cc: u32 },
}

/// Splits an outbound [`Message`] into frame strings, and classifies
/// inbound frames.
pub struct Framer<'a> {
    config: &'a TransportConfig,
}

impl<'a> Framer<'a> {
    pub fn new(config: &'a TransportConfig) -> Self {
        Self { config }
    }

    /// Build the outbound frame list for `message`. Single-element when the
    /// content is short and uncompressed; otherwise the compressed/chunked
    /// path.
    pub fn split(&self, message: &Message) -> Vec<String> {
        let single = self.single_frame_candidate(message);
        if message.ct.len() < self.config.compression_threshold
            && single.len() <= self.config.frame_limit
        {
            return vec![single];
        }
        self.chunked_frames(message)
    }

    fn single_frame_candidate(&self, message: &Message) -> String {
        let mut map = message.to_map();
        map.insert("ci".to_string(), Value::from(0));
        map.insert("cc".to_string(), Value::from(0));
        serde_json::to_string(&Value::Object(map)).expect("JSON map always serialises")
    }

    fn chunked_frames(&self, message: &Message) -> Vec<String> {
        let compressed = chirplink_codec::compress(message.ct.as_bytes());
        let encoded = BASE64.encode(compressed);
        let pieces: Vec<&[u8]> = encoded.as_bytes().chunks(self.config.chunk_data).collect();
        let cc = pieces.len().max(1) as u32;
        let metadata = message.metadata();

        let mut frames = Vec::with_capacity(cc as usize);
        for (ci, piece) in pieces.iter().enumerate() {
            let mut map = Map::new();
            map.insert("id".to_string(), Value::String(message.id.clone()));
            map.insert("ci".to_string(), Value::from(ci as u32));
            map.insert("cc".to_string(), Value::from(cc));
            if ci == 0 {
                for (k, v) in &metadata {
                    map.insert(k.clone(), v.clone());
                }
            }
            map.insert(
                "ct".to_string(),
                Value::String(String::from_utf8_lossy(piece).into_owned()),
            );
            let serialised =
                serde_json::to_string(&Value::Object(map)).expect("JSON map always serialises");
            if serialised.len() > self.config.frame_limit {
                tracing::warn!(
                    id = %message.id,
                    ci,
                    len = serialised.len(),
                    limit = self.config.frame_limit,
                    "outbound frame exceeds frame limit"
                );
            }
            frames.push(serialised);
        }
        frames
    }

    /// Classify a parsed JSON object into a [`ParseResult`].
    pub fn parse(&self, mut map: Map<String, Value>) -> Result<ParseResult, ParseError> {
        let id = map
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(ParseError::MissingId)?;

        if map.get("fn").and_then(Value::as_str) == Some("retx") {
            let missing = map
                .get("ci")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(Value::as_u64).map(|v| v as u32).collect())
                .unwrap_or_default();
            return Ok(ParseResult::Retx { id, missing });
        }

        let cc = map.get("cc").and_then(Value::as_u64).unwrap_or(0) as u32;
        let ci = map.get("ci").and_then(Value::as_u64).unwrap_or(0) as u32;

        if cc == 0 {
            let ct = map
                .remove("ct")
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_default();
            map.remove("ci");
            map.remove("cc");
            map.insert("id".to_string(), Value::String(id));
            map.insert("ct".to_string(), Value::String(ct));
            return Ok(ParseResult::Single {
                message: Message::from_map(map),
            });
        }

        if ci >= cc {
            return Err(ParseError::IndexOutOfRange { ci, cc });
        }

        let ct = map
            .remove("ct")
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        let meta = if ci == 0 {
            for key in ["id", "ci", "cc", "ct"] {
                map.remove(key);
            }
            Some(map)
        } else {
            None
        };

        Ok(ParseResult::ChunkPiece { id, ci, cc, ct, meta })
    }
}
