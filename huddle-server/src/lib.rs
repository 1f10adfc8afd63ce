//! Realtime signaling relay.
//!
//! Clients join named rooms, see each other's presence, and exchange opaque
//! negotiation payloads through the server. Payloads are routed, never read.

mod config;
mod engine;
mod error;
mod registry;
mod room;
mod server;
mod signaling;
mod transport;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use registry::*;
pub use room::*;
pub use server::*;
pub use signaling::*;
pub use transport::*;
