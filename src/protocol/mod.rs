//! Line-delimited JSON protocol.
//!
//! - `envelope`: request decoding and response envelopes
//! - `service`: method dispatch over a single connection manager

pub mod envelope;
pub mod service;

pub use envelope::{Method, Request};
pub use service::GatewayService;
