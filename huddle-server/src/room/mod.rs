mod presence;
mod reconnect;
mod room_directory;

pub use presence::*;
pub use reconnect::*;
pub use room_directory::*;
