//! A Conclave signaling server backed by the loopback media engine.
//!
//! No media flows anywhere: every negotiation succeeds in memory, which
//! is enough to exercise admission, slots, and the screen-share flow with
//! any WebSocket client:
//!
//! ```text
//! cargo run -p loopback-meeting -- 127.0.0.1:8080
//! ```

use conclave::SignalServer;
use conclave_room::{LoopbackEngine, RoomLimits};

#[tokio::main]
async fn main() -> Result<(), conclave::ConclaveError> {
    conclave::init_tracing();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());
    let server = SignalServer::builder()
        .bind(&addr)
        .limits(RoomLimits::default())
        .build(LoopbackEngine::new())
        .await?;
    tracing::info!(%addr, "loopback meeting server listening");
    server.run().await
}
