//! The application-level message model.
//!
//! A [`Message`] is what the application pipeline and the Framer exchange:
//! a required `id`/`ct` pair, the optional `fn`/`st` protocol fields, and an
//! open-ended bag of application-defined keys that the transport does not
//! interpret but must round-trip faithfully.

use serde_json::{Map, Value};

/// Wire keys the transport itself interprets. Anything else on a message is
/// opaque application metadata and is carried in [`Message::extra`].
pub const RESERVED_KEYS: &[&str] = &["id", "ci", "cc", "ct"];

/// A fully decoded (or not-yet-chunked) application message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub ct: String,
    pub function: Option<String>,
    pub status: Option<String>,
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(id: impl Into<String>, ct: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ct: ct.into(),
            function: None,
            status: None,
            extra: Map::new(),
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Build the flat JSON object for this message: `id`, `ct`, and any
    /// `fn`/`st`/extra keys the message carries. Does not include `ci`/`cc`
    /// — those are added by the Framer once it knows the frame layout.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        if let Some(f) = &self.function {
            map.insert("fn".to_string(), Value::String(f.clone()));
        }
        if let Some(s) = &self.status {
            map.insert("st".to_string(), Value::String(s.clone()));
        }
        for (k, v) in &self.extra {
            map.insert(k.clone(), v.clone());
        }
        map.insert("ct".to_string(), Value::String(self.ct.clone()));
        map
    }

    /// Reconstruct a message from a flat JSON object, pulling `id`, `ct`,
    /// `fn`, and `st` out of the reserved slots and leaving everything else
    /// in `extra`.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let id = map
            .remove("id")
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        let ct = map
            .remove("ct")
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        let function = map.remove("fn").and_then(|v| v.as_str().map(str::to_owned));
        let status = map.remove("st").and_then(|v| v.as_str().map(str::to_owned));
        map.remove("ci");
        map.remove("cc");

        Self {
            id,
            ct,
            function,
            status,
            extra: map,
        }
    }

    /// Every key this message would carry on chunk 0, other than the
    /// reserved framing keys — the metadata a multi-frame split pins to the
    /// first frame.
    pub fn metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        if let Some(f) = &self.function {
            meta.insert("fn".to_string(), Value::String(f.clone()));
        }
        if let Some(s) = &self.status {
            meta.insert("st".to_string(), Value::String(s.clone()));
        }
        for (k, v) in &self.extra {
            meta.insert(k.clone(), v.clone());
        }
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_map() {
        let msg = Message::new("abc1234", "hello")
            .with_function("echo")
            .with_status("S");
        let map = msg.to_map();
        let back = Message::from_map(map);
        assert_eq!(msg, back);
    }

    #[test]
    fn preserves_unknown_keys() {
        let mut msg = Message::new("abc1234", "hello");
        msg.extra.insert("custom".to_string(), Value::from(42));
        let map = msg.to_map();
        assert_eq!(map.get("custom"), Some(&Value::from(42)));
        let back = Message::from_map(map);
        assert_eq!(back.extra.get("custom"), Some(&Value::from(42)));
    }
}
