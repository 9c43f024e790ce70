//! chirplink-core — shared types used by every other chirplink crate:
//! the application message model, the transport error taxonomy, and
//! configuration loading.

pub mod config;
pub mod error;
pub mod frame;

pub use config::Config;
pub use error::TransportError;
pub use frame::{Message, RESERVED_KEYS};
