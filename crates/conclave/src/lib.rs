//! # Conclave
//!
//! Session and media coordination server for multi-party meetings.
//!
//! Conclave sits between meeting participants and an external real-time
//! media engine: it owns room membership, deterministic slot assignment,
//! the directory of live media resources, and the delta protocol that
//! keeps every client's mirror consistent. Media bytes never pass
//! through it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conclave::SignalServer;
//! use conclave_room::{LoopbackEngine, RoomLimits};
//!
//! # async fn run() -> Result<(), conclave::ConclaveError> {
//! let server = SignalServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .limits(RoomLimits::default())
//!     .build(LoopbackEngine::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ConclaveError;
pub use server::{SignalServer, SignalServerBuilder};

/// Installs a `tracing` subscriber reading the `RUST_LOG` environment
/// filter. Call once at startup; embedding applications that install
/// their own subscriber should skip it.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
