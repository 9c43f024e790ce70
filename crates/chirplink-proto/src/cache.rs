//! Bounded LRU memory of the frame strings most recently transmitted for
//! each message id, used only to answer inbound `retx` requests.

use std::collections::HashMap;

/// Keyed by message `id`, evicts the least-recently-touched entry once the
/// capacity is exceeded.
pub struct LastSentCache {
    capacity: usize,
    frames: HashMap<String, Vec<String>>,
    /// Touch order, oldest first. Re-touching a key moves it to the back.
    order: Vec<String>,
}

impl LastSentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            frames: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Store (or overwrite) the frames most recently sent for `id`.
    pub fn insert(&mut self, id: String, frames: Vec<String>) {
        if self.frames.contains_key(&id) {
            self.touch(&id);
        } else {
            self.evict_if_full();
            self.order.push(id.clone());
        }
        self.frames.insert(id, frames);
    }

    /// Look up a stored frame string by id and index.
    pub fn get(&self, id: &str, index: usize) -> Option<&str> {
        self.frames.get(id).and_then(|v| v.get(index)).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.frames.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn touch(&mut self, id: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == id) {
            let key = self.order.remove(pos);
            self.order.push(key);
        }
    }

    fn evict_if_full(&mut self) {
        if self.frames.len() < self.capacity {
            return;
        }
        if !self.order.is_empty() {
            let oldest = self.order.remove(0);
            tracing::debug!(id = %oldest, "last-sent cache full, evicting oldest id");
            self.frames.remove(&oldest);
        }
    }
}
