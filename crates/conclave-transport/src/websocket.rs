//! WebSocket signaling via `tokio-tungstenite`.
//!
//! Frames are text; binary frames from a peer are a protocol violation
//! and tear the channel down.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{ConnectionId, SignalChannel, SignalListener, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

/// A WebSocket [`SignalListener`] bound to a TCP address.
pub struct WebSocketListener {
    listener: TcpListener,
}

impl WebSocketListener {
    /// Binds to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "signaling listener bound");
        Ok(Self { listener })
    }

    /// The actual bound address, for `:0` binds in tests.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, TransportError> {
        self.listener.local_addr().map_err(TransportError::BindFailed)
    }
}

impl SignalListener for WebSocketListener {
    type Channel = WebSocketChannel;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Channel, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(TransportError::Handshake)?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, "signaling channel accepted");

        use futures_util::StreamExt;
        let (writer, reader) = ws.split();
        Ok(WebSocketChannel {
            id,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }
}

/// One accepted WebSocket signaling channel.
///
/// The socket is split into independently locked halves: a receiver
/// parked in `recv` never blocks a concurrent `send`, which is what lets
/// broadcast deltas reach a client that isn't currently requesting
/// anything.
pub struct WebSocketChannel {
    id: ConnectionId,
    writer: Mutex<SplitSink<WsStream, Message>>,
    reader: Mutex<SplitStream<WsStream>>,
}

impl SignalChannel for WebSocketChannel {
    type Error = TransportError;

    async fn send(&self, frame: &str) -> Result<(), Self::Error> {
        use futures_util::SinkExt;
        self.writer
            .lock()
            .await
            .send(Message::Text(frame.to_owned().into()))
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<String>, Self::Error> {
        use futures_util::StreamExt;
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Binary(_))) => return Err(TransportError::UnexpectedFrame),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // ping/pong keepalives
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e)),
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        use futures_util::SinkExt;
        self.writer
            .lock()
            .await
            .close()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
