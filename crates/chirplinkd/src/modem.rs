//! The acoustic modem boundary.
//!
//! `Modem` is deliberately opaque: this crate does not implement tone
//! encoding. Real hardware bring-up plugs a ggwave-style codec in behind
//! this trait; tests use [`LoopbackModem`].

/// Encodes bytes to a waveform and decodes a waveform block back to bytes.
pub trait Modem {
    /// Encode `data` as a waveform at the given protocol and volume.
    fn encode(&self, data: &str, protocol_id: u8, volume: u8) -> Vec<f32>;

    /// Decode one block of samples. Returns `None` when no complete frame
    /// was recognised in this block.
    fn decode(&mut self, samples: &[f32]) -> Option<Vec<u8>>;
}

/// A test double that frames encoded buffers as raw bytes reinterpreted as
/// samples and decodes them back, with injectable loss/duplication/reorder
/// behaviour under test control.
pub struct LoopbackModem {
    /// Pending inbound frames, in delivery order. Each call to `decode`
    /// pops at most one.
    inbox: std::collections::VecDeque<Vec<u8>>,
}

impl LoopbackModem {
    pub fn new() -> Self {
        Self {
            inbox: std::collections::VecDeque::new(),
        }
    }

    /// Queue a frame for the next `decode` calls to return, simulating a
    /// frame arriving over the acoustic link.
    pub fn deliver(&mut self, frame: Vec<u8>) {
        self.inbox.push_back(frame);
    }

    /// Queue the same frame to simulate a duplicate delivery.
    pub fn duplicate_last(&mut self) {
        if let Some(last) = self.inbox.back().cloned() {
            self.inbox.push_back(last);
        }
    }
}

impl Default for LoopbackModem {
    fn default() -> Self {
        Self::new()
    }
}

impl Modem for LoopbackModem {
    fn encode(&self, data: &str, _protocol_id: u8, _volume: u8) -> Vec<f32> {
        data.bytes().map(|b| b as f32 / 255.0).collect()
    }

    fn decode(&mut self, _samples: &[f32]) -> Option<Vec<u8>> {
        self.inbox.pop_front()
    }
}
