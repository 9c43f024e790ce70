//! Transport error taxonomy.
//!
//! Every fallible path in the protocol stack collapses into one of these
//! variants. None of them propagate across the wire directly — the session
//! loop either drops the offending frame, schedules a retransmission, or
//! (for `ApplicationError`) turns the error into an `st: "E"` response.

use thiserror::Error;

/// Errors raised while handling a single frame or reassembly entry.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Malformed JSON, bad base64, an LZNT1 stream violation, or non-UTF-8
    /// content after decompression.
    #[error("corrupt input: {0}")]
    CorruptInput(String),

    /// A serialised frame exceeded `FRAME_LIMIT`. Logged, not fatal — the
    /// frame is transmitted anyway.
    #[error("frame of {len} bytes exceeds the {limit}-byte limit")]
    OversizeFrame { len: usize, limit: usize },

    /// An incoming chunk's `cc` disagreed with the `cc` already on file for
    /// that `id`.
    #[error("id {id} already has cc={expected}, incoming chunk claims cc={got}")]
    IdCollision {
        id: String,
        expected: u32,
        got: u32,
    },

    /// A reassembly entry aged past `REASSEMBLY_TIMEOUT` with chunks still
    /// missing.
    #[error("reassembly of {id} timed out with {missing} chunk(s) missing")]
    ReassemblyTimeout { id: String, missing: usize },

    /// An inbound retx named an `id` absent from the last-sent cache.
    #[error("retx requested for unknown id {0}")]
    StaleRetx(String),

    /// The application pipeline raised an error while processing a message.
    #[error("application error for {id}: {message}")]
    ApplicationError { id: String, message: String },

    /// The modem or audio I/O layer failed in a way the session cannot
    /// recover from.
    #[error("transport fatal: {0}")]
    TransportFatal(String),
}
