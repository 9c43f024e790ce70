//! Per-message inbound state: which chunks have arrived, and when the
//! message was first seen.

use std::collections::BTreeMap;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chirplink_core::error::TransportError;
use chirplink_core::frame::Message;
use serde_json::{Map, Value};

use crate::framer::ParseResult;

struct Entry {
    cc: u32,
    chunks: BTreeMap<u32, String>,
    meta: Map<String, Value>,
    first_seen: Instant,
}

/// Outcome of absorbing one chunk piece.
pub enum Absorbed {
    Incomplete,
    Complete(Message),
    /// Decoding the finished message failed; the entry has been dropped.
    Failed(TransportError),
    /// The piece disagreed with the stored chunk count and was dropped.
    Collision { expected: u32, got: u32 },
}

/// Tracks in-flight reassembly of chunked inbound messages, keyed by `id`.
pub struct ReassemblyTable {
    entries: BTreeMap<String, Entry>,
    capacity: usize,
    ceiling: usize,
}

impl ReassemblyTable {
    pub fn new(capacity: usize, ceiling: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
            ceiling,
        }
    }

    /// Absorb one chunk piece, reassembling the message if this was the
    /// last missing piece.
    pub fn absorb(
        &mut self,
        id: String,
        ci: u32,
        cc: u32,
        ct: String,
        meta: Option<Map<String, Value>>,
        now: Instant,
    ) -> Absorbed {
        if !self.entries.contains_key(&id) {
            self.evict_if_full();
            self.entries.insert(
                id.clone(),
                Entry {
                    cc,
                    chunks: BTreeMap::new(),
                    meta: Map::new(),
                    first_seen: now,
                },
            );
        }

        let entry = self.entries.get_mut(&id).expect("just inserted");
        if entry.cc != cc {
            let expected = entry.cc;
            tracing::warn!(id = %id, expected, got = cc, "chunk count collision, dropping piece");
            return Absorbed::Collision { expected, got: cc };
        }

        entry.chunks.insert(ci, ct);
        if let Some(meta) = meta {
            entry.meta.extend(meta);
        }

        if entry.chunks.len() as u32 != entry.cc {
            return Absorbed::Incomplete;
        }

        let entry = self.entries.remove(&id).expect("present");
        match reassemble(&entry, self.ceiling) {
            Ok(content) => {
                let mut map = entry.meta;
                map.insert("id".to_string(), Value::String(id));
                map.insert("ct".to_string(), Value::String(content));
                Absorbed::Complete(Message::from_map(map))
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "reassembly failed, dropping entry");
                Absorbed::Failed(e)
            }
        }
    }

    /// Process a [`ParseResult::ChunkPiece`] directly.
    pub fn absorb_piece(&mut self, result: ParseResult, now: Instant) -> Option<Absorbed> {
        match result {
            ParseResult::ChunkPiece { id, ci, cc, ct, meta } => {
                Some(self.absorb(id, ci, cc, ct, meta, now))
            }
            _ => None,
        }
    }

    /// Entries whose age exceeds `timeout`, along with their missing
    /// indices. Does not mutate the table; callers decide whether to
    /// reset the clock or drop the entry via [`ReassemblyTable::reset_clock`]
    /// / [`ReassemblyTable::remove`].
    pub fn timed_out(
        &self,
        timeout: std::time::Duration,
        now: Instant,
    ) -> Vec<(String, Vec<u32>)> {
        self.entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.first_seen) > timeout)
            .map(|(id, entry)| {
                let missing: Vec<u32> = (0..entry.cc)
                    .filter(|i| !entry.chunks.contains_key(i))
                    .collect();
                (id.clone(), missing)
            })
            .collect()
    }

    pub fn reset_clock(&mut self, id: &str, now: Instant) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.first_seen = now;
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.entries.remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_if_full(&mut self) {
        if self.entries.len() < self.capacity {
            return;
        }
        if let Some(oldest_id) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.first_seen)
            .map(|(id, _)| id.clone())
        {
            tracing::warn!(id = %oldest_id, "reassembly table full, evicting oldest entry");
            self.entries.remove(&oldest_id);
        }
    }
}

fn reassemble(entry: &Entry, ceiling: usize) -> Result<String, TransportError> {
    let mut encoded = String::new();
    for ci in 0..entry.cc {
        let piece = entry
            .chunks
            .get(&ci)
            .expect("completeness checked by caller");
        encoded.push_str(piece);
    }
    let compressed = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| TransportError::CorruptInput(format!("bad base64: {e}")))?;
    let raw = chirplink_codec::decompress(&compressed, ceiling)
        .map_err(|e| TransportError::CorruptInput(format!("lznt1: {e}")))?;
    String::from_utf8(raw).map_err(|e| TransportError::CorruptInput(format!("bad utf-8: {e}")))
}
