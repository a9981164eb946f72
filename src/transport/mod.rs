//! Transport layer for the gateway.
//!
//! Only stdio is supported: one JSON request per input line, one JSON response
//! per output line.

pub mod stdio;

pub use stdio::{ShutdownReason, StdioTransport, wait_for_signal};
