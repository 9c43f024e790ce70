//! chirplink-proto — the Framer, Reassembly Table, last-sent cache, and
//! Retransmission Controller that sit between the wire and the application.

pub mod cache;
pub mod framer;
pub mod reassembly;
pub mod retransmit;

pub use cache::LastSentCache;
pub use framer::{Framer, ParseError, ParseResult};
pub use reassembly::{Absorbed, ReassemblyTable};
pub use retransmit::RetransmissionController;
