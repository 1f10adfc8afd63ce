//! Wire model shared by the huddle signaling server and its clients.

pub mod model;

pub use model::*;
