//! Composition root for the HMI core.
//!
//! Builds every component from one [`HmiConfig`](hmicore_core::HmiConfig),
//! binds them to a single scheduler timeline and routes inbound messages.

pub mod error;
pub mod message;
pub mod runtime;

pub use error::{RuntimeError, RuntimeResult};
pub use message::InboundMessage;
pub use runtime::HmiRuntime;
