/// Errors that can occur in the signaling transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket handshake was rejected.
    #[cfg(feature = "websocket")]
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tokio_tungstenite::tungstenite::Error),

    /// Sending a frame failed; the channel is unusable afterwards.
    #[cfg(feature = "websocket")]
    #[error("send failed: {0}")]
    SendFailed(#[source] tokio_tungstenite::tungstenite::Error),

    /// Receiving a frame failed.
    #[cfg(feature = "websocket")]
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] tokio_tungstenite::tungstenite::Error),

    /// The peer sent a non-text frame where a signaling frame was
    /// expected.
    #[error("unexpected frame type")]
    UnexpectedFrame,
}
