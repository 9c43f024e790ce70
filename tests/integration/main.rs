//! Cross-crate integration tests for the acoustic link transport.

mod chunking;
mod retransmission;
