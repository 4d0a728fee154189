//! Ghostchat server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address
//! ghostchat-server
//!
//! # Custom address, closing superseded sockets
//! ghostchat-server --bind 127.0.0.1:9000 --evict-superseded
//! ```

use clap::Parser;
use ghostchat_core::{ReplacePolicy, RouterConfig};
use ghostchat_server::{Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Ghostchat anonymous chat server
#[derive(Parser, Debug)]
#[command(name = "ghostchat-server")]
#[command(about = "Ephemeral anonymous chat server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, env = "GHOSTCHAT_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// Largest inbound WebSocket message, in bytes
    #[arg(long, default_value = "1048576")]
    max_frame_bytes: usize,

    /// Per-connection outbound queue capacity
    #[arg(long, default_value = "256")]
    outbound_queue: usize,

    /// Close a socket when the same identity connects again
    #[arg(long)]
    evict_superseded: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Ghostchat server starting");
    tracing::info!("Binding to {}", args.bind);

    let replace_policy =
        if args.evict_superseded { ReplacePolicy::CloseSuperseded } else { ReplacePolicy::Silent };

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        max_frame_bytes: args.max_frame_bytes,
        outbound_queue: args.outbound_queue,
        router: RouterConfig { replace_policy },
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
