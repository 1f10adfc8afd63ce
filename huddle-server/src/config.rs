use std::net::SocketAddr;

pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,
    /// Name shown for members that join without one.
    pub default_display_name: String,
    /// Capacity of the inbound event queue shared by all connections.
    pub event_queue_capacity: usize,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            default_display_name: DEFAULT_DISPLAY_NAME.to_string(),
            event_queue_capacity: 1024,
            log_filter: "info".to_string(),
        }
    }
}
