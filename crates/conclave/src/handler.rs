//! Per-connection handler: admission, event forwarding, and request
//! dispatch.
//!
//! Each accepted channel gets its own Tokio task running this handler.
//! The flow is:
//!   1. Admit the connection into the room → send the snapshot (seq 0)
//!   2. Spawn a forwarder task pushing broadcast deltas to the peer
//!   3. Loop: receive request frames → dispatch to the room actor →
//!      reply with the matching seq
//!   4. On close (clean or not), the drop guard leaves the room, which
//!      destroys every owned media resource

use std::sync::Arc;

use conclave_protocol::{
    ClientFrame, ClientRequest, Codec, ParticipantId, ReplyData, ServerBody,
    ServerFrame,
};
use conclave_room::{RoomError, RoomHandle};
use conclave_transport::{SignalChannel, WebSocketChannel};
use tokio::sync::mpsc;

use crate::ConclaveError;
use crate::server::ServerState;

/// Drop guard that removes the participant when the handler exits.
///
/// Cleanup happens even if the handler errors or panics. `Drop` is
/// synchronous, so the leave is a fire-and-forget task; `NotJoined` from
/// an already-left participant is expected and ignored.
struct LeaveGuard {
    id: ParticipantId,
    room: RoomHandle,
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        let id = self.id;
        let room = self.room.clone();
        tokio::spawn(async move {
            let _ = room.leave(id).await;
        });
    }
}

/// Handles a single signaling connection from admission to close.
pub(crate) async fn handle_connection<C>(
    channel: WebSocketChannel,
    state: Arc<ServerState<C>>,
) -> Result<(), ConclaveError>
where
    C: Codec + Clone,
{
    let id = ParticipantId(channel.id().into_inner());
    let channel = Arc::new(channel);
    tracing::debug!(%id, "handling new connection");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    // Admission failure is terminal: report it and close.
    let snapshot = match state.room.admit(id, event_tx).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::info!(%id, error = %e, "admission rejected");
            send_frame(&channel, &state.codec, 0, error_body(&e)).await?;
            let _ = channel.close().await;
            return Ok(());
        }
    };
    let _guard = LeaveGuard {
        id,
        room: state.room.clone(),
    };

    send_frame(
        &channel,
        &state.codec,
        0,
        ServerBody::Reply(ReplyData::Admitted { snapshot }),
    )
    .await?;
    tracing::info!(%id, "participant admitted");

    // Broadcast deltas ride the same channel as replies; both frames are
    // full serialized strings by the time they hit the socket, so the
    // channel mutex keeps them whole.
    let forward_channel = Arc::clone(&channel);
    let forward_codec = state.codec.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let frame = ServerFrame {
                seq: 0,
                body: ServerBody::Event(event),
            };
            let text = match forward_codec.encode(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if forward_channel.send(&text).await.is_err() {
                break;
            }
        }
    });

    // Request loop.
    loop {
        let text = match channel.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!(%id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%id, error = %e, "recv error");
                break;
            }
        };

        let frame: ClientFrame = match state.codec.decode(&text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%id, error = %e, "undecodable frame");
                send_frame(
                    &channel,
                    &state.codec,
                    0,
                    ServerBody::Error {
                        code: 400,
                        message: "malformed frame".into(),
                    },
                )
                .await?;
                continue;
            }
        };

        let leaving = matches!(frame.request, ClientRequest::Leave);
        let body = match dispatch(&state.room, id, frame.request).await {
            Ok(reply) => ServerBody::Reply(reply),
            Err(e) => {
                tracing::debug!(%id, error = %e, "request failed");
                error_body(&e)
            }
        };
        send_frame(&channel, &state.codec, frame.seq, body).await?;

        if leaving {
            break;
        }
    }

    forwarder.abort();
    // _guard drops here → the participant leaves the room.
    Ok(())
}

/// Routes one request to the room actor.
async fn dispatch(
    room: &RoomHandle,
    id: ParticipantId,
    request: ClientRequest,
) -> Result<ReplyData, RoomError> {
    match request {
        ClientRequest::Rename { name } => {
            room.rename(id, name).await?;
            Ok(ReplyData::Renamed)
        }
        ClientRequest::ToggleMedia { kind, enabled } => {
            room.toggle_media(id, kind, enabled).await?;
            Ok(ReplyData::Toggled)
        }
        ClientRequest::Capabilities => {
            let caps = room.capabilities(id).await?;
            Ok(ReplyData::Capabilities { caps })
        }
        ClientRequest::CreateTransport { direction } => {
            let transport = room.create_transport(id, direction).await?;
            Ok(ReplyData::TransportCreated { transport })
        }
        ClientRequest::ConnectTransport {
            transport_id,
            handshake,
        } => {
            room.connect_transport(id, transport_id, handshake).await?;
            Ok(ReplyData::TransportConnected)
        }
        ClientRequest::CreateProducer {
            transport_id,
            kind,
            source,
            rtp_params,
        } => {
            let (producer_id, slot) = room
                .create_producer(id, transport_id, kind, source, rtp_params)
                .await?;
            Ok(ReplyData::ProducerCreated { producer_id, slot })
        }
        ClientRequest::Consume {
            transport_id,
            producer_id,
            caps,
        } => {
            let consumer = room.consume(id, transport_id, producer_id, caps).await?;
            Ok(ReplyData::Consumed { consumer })
        }
        ClientRequest::StopScreenShare => {
            let ended = room.stop_screen_share(id).await?;
            Ok(ReplyData::ScreenShareStopped { ended })
        }
        ClientRequest::Leave => {
            room.leave(id).await?;
            Ok(ReplyData::Left)
        }
    }
}

fn error_body(err: &RoomError) -> ServerBody {
    ServerBody::Error {
        code: err.code(),
        message: err.to_string(),
    }
}

async fn send_frame(
    channel: &WebSocketChannel,
    codec: &impl Codec,
    seq: u64,
    body: ServerBody,
) -> Result<(), ConclaveError> {
    let text = codec.encode(&ServerFrame { seq, body })?;
    channel.send(&text).await?;
    Ok(())
}
