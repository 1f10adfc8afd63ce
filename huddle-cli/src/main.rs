use anyhow::Result;
use clap::Parser;
use colored::*;
use huddle_server::{DEFAULT_DISPLAY_NAME, ServerConfig, serve};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "huddle")]
#[command(about = "Room presence and WebRTC signaling relay")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "HUDDLE_BIND", default_value = "0.0.0.0:3001")]
    bind: SocketAddr,

    /// Name shown for members that join without one.
    #[arg(long, env = "HUDDLE_DEFAULT_NAME", default_value = DEFAULT_DISPLAY_NAME)]
    default_name: String,

    /// Capacity of the inbound event queue.
    #[arg(long, env = "HUDDLE_QUEUE_CAPACITY", default_value_t = 1024)]
    queue_capacity: usize,

    /// Log filter, e.g. `info` or `huddle_server=debug`.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log: String,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            bind_addr: cli.bind,
            default_display_name: cli.default_name,
            event_queue_capacity: cli.queue_capacity.max(1),
            log_filter: cli.log,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from(Cli::parse());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    println!("{}", "Starting huddle signaling relay...".green().bold());
    let url = format!("ws://{}/ws", config.bind_addr);
    println!("   Listening: {}", url.as_str().cyan());
    info!("Default display name: {}", config.default_display_name);

    serve(config).await
}
