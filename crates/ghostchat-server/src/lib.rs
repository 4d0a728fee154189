//! Ghostchat production server.
//!
//! This crate provides the production server implementation using:
//! - axum for HTTP and WebSocket transport
//! - Tokio for async runtime
//! - System time and cryptographic RNG
//!
//! ## Architecture
//!
//! ```text
//! ghostchat-server
//!   ├─ SystemEnv      (production Environment impl)
//!   ├─ http           (POST /api/register, POST /api/login, GET /health)
//!   ├─ ws             (GET /ws?token=..., one socket per identity)
//!   └─ Gateway        (router + outbound queues, behind one Mutex)
//!        └─ MessageRouter (ghostchat-core)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod gateway;
mod http;
mod system_env;
mod ws;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
pub use error::ServerError;
pub use gateway::{Gateway, Outbound};
use ghostchat_core::RouterConfig;
pub use system_env::SystemEnv;
use tokio::{net::TcpListener, sync::Mutex};

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080")
    pub bind_address: String,
    /// Largest inbound WebSocket message accepted, in bytes
    pub max_frame_bytes: usize,
    /// Capacity of each connection's outbound queue
    pub outbound_queue: usize,
    /// Router configuration (replacement policy)
    pub router: RouterConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_frame_bytes: 1024 * 1024,
            outbound_queue: 256,
            router: RouterConfig::default(),
        }
    }
}

/// State shared by every handler.
#[derive(Clone)]
pub(crate) struct AppState {
    gateway: Arc<Mutex<Gateway>>,
    max_frame_bytes: usize,
    outbound_queue: usize,
}

/// Build the HTTP + WebSocket router.
fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/register", post(http::register_handler))
        .route("/api/login", post(http::login_handler))
        .route("/health", get(http::health_handler))
        .route("/ws", get(ws::ws_upgrade_handler))
        .with_state(state)
}

/// Production Ghostchat server.
///
/// Wraps a `Gateway` with axum transport and the system environment.
pub struct Server {
    listener: TcpListener,
    app: Router,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The queue capacity is zero
    /// - Binding to the address fails
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        if config.outbound_queue == 0 {
            return Err(ServerError::Config("outbound queue capacity must be non-zero".into()));
        }

        let gateway = Gateway::new(SystemEnv::new(), config.router);
        let state = AppState {
            gateway: Arc::new(Mutex::new(gateway)),
            max_frame_bytes: config.max_frame_bytes,
            outbound_queue: config.outbound_queue,
        };

        let listener = TcpListener::bind(&config.bind_address).await?;

        Ok(Self { listener, app: build_app(state) })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve HTTP and WebSocket requests until the listener fails.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.local_addr()?);
        axum::serve(self.listener, self.app).await?;
        Ok(())
    }
}
