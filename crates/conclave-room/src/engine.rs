//! The media engine seam.
//!
//! The coordination layer never touches media bytes. Everything
//! RTP/ICE/DTLS-shaped lives behind [`MediaEngine`], an opaque capability
//! provider: it mints transports, producers, and consumers, and answers
//! compatibility questions. The room actor is generic over this trait,
//! so tests and demos run against [`LoopbackEngine`] while production
//! plugs in a real SFU binding.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use conclave_protocol::{
    ConsumerDescriptor, ConsumerId, MediaKind, ProducerId, TransportDescriptor,
    TransportDirection, TransportId,
};
use rand::Rng;
use serde_json::Value;

use crate::EngineError;

/// The surface of the external real-time media engine that the room
/// consumes.
///
/// Implementations own the actual media plumbing; the room only records
/// ids and owners. Every call is a potential suspension point for the
/// room actor, which is why the actor re-validates capacity *after*
/// producer creation returns.
///
/// Methods are declared in `impl Future + Send` form rather than
/// `async fn` so the actor's task stays spawnable when the room is
/// generic over the engine; implementations may still write `async fn`.
pub trait MediaEngine: Send + Sync + 'static {
    /// The engine's capability document, required by clients before any
    /// negotiation.
    fn router_capabilities(&self) -> impl Future<Output = Value> + Send;

    /// Creates a transport and returns its descriptor (id plus the
    /// engine's connection parameter blob).
    fn create_transport(
        &self,
        direction: TransportDirection,
    ) -> impl Future<Output = Result<TransportDescriptor, EngineError>> + Send;

    /// Completes a transport's connection handshake.
    fn connect_transport(
        &self,
        transport_id: &TransportId,
        handshake: Value,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Creates a producer on a send transport and returns its id.
    fn create_producer(
        &self,
        transport_id: &TransportId,
        kind: MediaKind,
        rtp_params: Value,
    ) -> impl Future<Output = Result<ProducerId, EngineError>> + Send;

    /// Whether a receiver with `caps` can consume the given producer.
    fn can_consume(
        &self,
        producer_id: &ProducerId,
        caps: &Value,
    ) -> impl Future<Output = bool> + Send;

    /// Creates a consumer for a remote producer on a receive transport.
    fn create_consumer(
        &self,
        transport_id: &TransportId,
        producer_id: &ProducerId,
        caps: Value,
    ) -> impl Future<Output = Result<ConsumerDescriptor, EngineError>> + Send;

    /// Closes a producer. Idempotent.
    fn close_producer(&self, producer_id: &ProducerId) -> impl Future<Output = ()> + Send;

    /// Closes a transport and everything riding on it. Idempotent.
    fn close_transport(&self, transport_id: &TransportId) -> impl Future<Output = ()> + Send;
}

/// An in-memory [`MediaEngine`] that moves no media.
///
/// Tracks just enough state to answer honestly: transports must exist to
/// produce, producers must exist to consume, and `can_consume` requires a
/// non-null capability document. Used by the test suites and the demo
/// wiring in the `conclave` facade.
#[derive(Default)]
pub struct LoopbackEngine {
    state: Mutex<LoopbackState>,
}

#[derive(Default)]
struct LoopbackState {
    transports: HashMap<TransportId, TransportDirection>,
    producers: HashMap<ProducerId, MediaKind>,
}

static NEXT_RESOURCE: AtomicU64 = AtomicU64::new(1);

/// Generates an engine-style resource id: a short random hex string with
/// a monotonic suffix so ids stay unique even if the RNG repeats.
fn resource_id(prefix: &str) -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 4] = rng.random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    let n = NEXT_RESOURCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{hex}{n}")
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoopbackState> {
        // No method panics while holding the lock, so a poisoned guard
        // still carries consistent state.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl MediaEngine for LoopbackEngine {
    async fn router_capabilities(&self) -> Value {
        serde_json::json!({
            "codecs": [
                { "kind": "audio", "mimeType": "audio/opus" },
                { "kind": "video", "mimeType": "video/VP8" },
            ],
        })
    }

    async fn create_transport(
        &self,
        direction: TransportDirection,
    ) -> Result<TransportDescriptor, EngineError> {
        let id = TransportId(resource_id("trn"));
        self.lock().transports.insert(id.clone(), direction);
        Ok(TransportDescriptor {
            id: id.clone(),
            direction,
            params: serde_json::json!({ "id": id, "iceParameters": {}, "dtlsParameters": {} }),
        })
    }

    async fn connect_transport(
        &self,
        transport_id: &TransportId,
        handshake: Value,
    ) -> Result<(), EngineError> {
        if !self.lock().transports.contains_key(transport_id) {
            return Err(EngineError::UnknownResource(transport_id.to_string()));
        }
        if handshake.is_null() {
            return Err(EngineError::Rejected("empty handshake".into()));
        }
        Ok(())
    }

    async fn create_producer(
        &self,
        transport_id: &TransportId,
        kind: MediaKind,
        rtp_params: Value,
    ) -> Result<ProducerId, EngineError> {
        let mut state = self.lock();
        if !state.transports.contains_key(transport_id) {
            return Err(EngineError::UnknownResource(transport_id.to_string()));
        }
        if rtp_params.is_null() {
            return Err(EngineError::Rejected("missing rtp parameters".into()));
        }
        let id = ProducerId(resource_id("prd"));
        state.producers.insert(id.clone(), kind);
        Ok(id)
    }

    async fn can_consume(&self, producer_id: &ProducerId, caps: &Value) -> bool {
        !caps.is_null() && self.lock().producers.contains_key(producer_id)
    }

    async fn create_consumer(
        &self,
        transport_id: &TransportId,
        producer_id: &ProducerId,
        caps: Value,
    ) -> Result<ConsumerDescriptor, EngineError> {
        let state = self.lock();
        if !state.transports.contains_key(transport_id) {
            return Err(EngineError::UnknownResource(transport_id.to_string()));
        }
        let Some(&kind) = state.producers.get(producer_id) else {
            return Err(EngineError::UnknownResource(producer_id.to_string()));
        };
        if caps.is_null() {
            return Err(EngineError::Rejected("incompatible capabilities".into()));
        }
        Ok(ConsumerDescriptor {
            id: ConsumerId(resource_id("cns")),
            producer_id: producer_id.clone(),
            kind,
            params: serde_json::json!({ "producerId": producer_id }),
        })
    }

    async fn close_producer(&self, producer_id: &ProducerId) {
        self.lock().producers.remove(producer_id);
    }

    async fn close_transport(&self, transport_id: &TransportId) {
        self.lock().transports.remove(transport_id);
    }
}
