mod connection;
mod presence;
mod room;
mod signaling;

pub use connection::ConnectionId;
pub use presence::{MemberPresence, NoiseSuppressionLevel, Role};
pub use room::RoomId;
pub use signaling::{ClientMessage, RelayFailure, RelayKind, ServerMessage, now_millis};
