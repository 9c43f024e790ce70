//! The single-threaded cooperative session loop.
//!
//! One owner (`Session`) holds the modem, the reassembly table, the
//! last-sent cache, and the retransmission controller — no locking, no
//! shared state across threads. `step`/`sweep` are the two entry points
//! unit tests drive directly with an explicit clock; `run` wraps them in
//! the blocking read/sleep/write loop a real binary uses.

use std::thread;
use std::time::Instant;

use chirplink_core::config::TransportConfig;
use chirplink_core::frame::Message;
use chirplink_proto::{Absorbed, Framer, LastSentCache, ParseResult, ReassemblyTable, RetransmissionController};
use serde_json::{Map, Value};

use crate::modem::Modem;
use crate::pipeline::Pipeline;

pub struct Session<M, P> {
    modem: M,
    pipeline: P,
    config: TransportConfig,
    reassembly: ReassemblyTable,
    cache: LastSentCache,
    controller: RetransmissionController,
    protocol_id: u8,
    volume: u8,
}

impl<M: Modem, P: Pipeline> Session<M, P> {
    pub fn new(modem: M, pipeline: P, config: TransportConfig, protocol_id: u8, volume: u8) -> Self {
        let reassembly = ReassemblyTable::new(config.reassembly_table_cap, config.decompress_ceiling);
        let controller = RetransmissionController::new(config.sweep_interval());
        let cache = LastSentCache::new(config.last_sent_cache_cap);
        Self {
            modem,
            pipeline,
            config,
            reassembly,
            cache,
            controller,
            protocol_id,
            volume,
        }
    }

    /// Handle one decoded frame: classify it, feed it to reassembly or the
    /// retx controller, and run the application pipeline if it completed a
    /// message. Returns the frame strings that should be transmitted, in
    /// order.
    pub fn handle_frame(&mut self, raw: &[u8], now: Instant) -> Vec<String> {
        let text = match std::str::from_utf8(raw) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "inbound frame was not valid utf-8");
                return Vec::new();
            }
        };
        let map: Map<String, Value> = match serde_json::from_str(text) {
            Ok(Value::Object(m)) => m,
            Ok(_) => {
                tracing::warn!("inbound frame was not a JSON object");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "inbound frame was not valid json");
                return Vec::new();
            }
        };

        let framer = Framer::new(&self.config);
        let parsed = match framer.parse(map) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = ?e, "dropping malformed frame");
                return Vec::new();
            }
        };

        match parsed {
            ParseResult::Retx { id, missing } => match self.controller.honour_retx(&id, &missing, &self.cache) {
                Ok(frames) => frames,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping retx for unknown id");
                    Vec::new()
                }
            },
            ParseResult::Single { message } => self.respond(message),
            piece @ ParseResult::ChunkPiece { .. } => match self.reassembly.absorb_piece(piece, now) {
                Some(Absorbed::Complete(message)) => self.respond(message),
                Some(Absorbed::Failed(e)) => {
                    tracing::warn!(error = %e, "reassembly failed");
                    Vec::new()
                }
                _ => Vec::new(),
            },
        }
    }

    fn respond(&mut self, request: Message) -> Vec<String> {
        let response = self.pipeline.process(request);
        let framer = Framer::new(&self.config);
        let frames = framer.split(&response);
        self.cache.insert(response.id.clone(), frames.clone());
        frames
    }

    /// One pass of the outbound retransmission sweep, internally
    /// rate-limited to `SWEEP_INTERVAL`.
    pub fn sweep(&mut self, now: Instant) -> Vec<String> {
        self.controller.sweep(&mut self.reassembly, &self.config, now)
    }

    /// Drive the cooperative loop: block on `read_block` for the next
    /// decoded frame, dispatch it, run the periodic sweep, and transmit
    /// any resulting frames via `write_block` with `INTER_FRAME_DELAY`
    /// between them. Runs until `should_continue` returns false.
    pub fn run(
        &mut self,
        mut read_block: impl FnMut() -> Vec<f32>,
        mut write_block: impl FnMut(Vec<f32>),
        mut should_continue: impl FnMut() -> bool,
    ) {
        while should_continue() {
            let block = read_block();
            if let Some(raw) = self.modem.decode(&block) {
                let frames = self.handle_frame(&raw, Instant::now());
                self.transmit(frames, &mut write_block);
            }

            let retx_frames = self.sweep(Instant::now());
            self.transmit(retx_frames, &mut write_block);
        }
    }

    fn transmit(&self, frames: Vec<String>, write_block: &mut impl FnMut(Vec<f32>)) {
        let mut first = true;
        for frame in frames {
            if !first {
                thread::sleep(self.config.inter_frame_delay());
            }
            first = false;
            let waveform = self.modem.encode(&frame, self.protocol_id, self.volume);
            write_block(waveform);
        }
    }
}
