//! Integration tests driving real WebSocket connections against a
//! `SignalServer` backed by the loopback engine.

use std::collections::VecDeque;
use std::time::Duration;

use conclave::SignalServer;
use conclave_room::{LoopbackEngine, RoomLimits};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// One connected test client over the real wire.
///
/// Broadcast events interleave freely with replies, so events read while
/// waiting for something else are stashed for later `event()` calls
/// instead of dropped.
struct TestClient {
    ws: Ws,
    seq: u64,
    stash: VecDeque<Value>,
}

impl TestClient {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        Self {
            ws,
            seq: 0,
            stash: VecDeque::new(),
        }
    }

    /// The admission snapshot every accepted connection receives first.
    async fn admitted(&mut self) -> Value {
        let frame = self.next_frame().await;
        assert_eq!(frame["seq"], 0);
        assert_eq!(frame["body"]["type"], "Reply");
        assert_eq!(frame["body"]["data"]["type"], "Admitted");
        frame["body"]["data"]["snapshot"].clone()
    }

    async fn next_frame(&mut self) -> Value {
        let msg = tokio::time::timeout(Duration::from_secs(5), self.ws.next())
            .await
            .expect("frame should arrive")
            .expect("stream should stay open")
            .expect("frame should decode");
        serde_json::from_str(msg.to_text().unwrap()).expect("frame should be JSON")
    }

    async fn send_request(&mut self, request: Value) -> u64 {
        self.seq += 1;
        let frame = json!({ "seq": self.seq, "request": request });
        self.ws
            .send(Message::Text(frame.to_string().into()))
            .await
            .expect("send should succeed");
        self.seq
    }

    /// Sends a request and waits for its reply (or error), stashing
    /// interleaved broadcast events.
    async fn request(&mut self, request: Value) -> Value {
        let seq = self.send_request(request).await;
        loop {
            let frame = self.next_frame().await;
            if frame["seq"] == seq {
                return frame["body"].clone();
            }
            assert_eq!(frame["body"]["type"], "Event", "unexpected frame: {frame}");
            self.stash.push_back(frame["body"]["data"].clone());
        }
    }

    /// Waits for a broadcast event of the given type, draining the stash
    /// first and stashing other events encountered on the way.
    async fn event(&mut self, event_type: &str) -> Value {
        if let Some(pos) = self.stash.iter().position(|e| e["type"] == event_type) {
            return self.stash.remove(pos).unwrap();
        }
        loop {
            let frame = self.next_frame().await;
            assert_eq!(frame["body"]["type"], "Event", "unexpected frame: {frame}");
            let data = frame["body"]["data"].clone();
            if data["type"] == event_type {
                return data;
            }
            self.stash.push_back(data);
        }
    }

    /// Waits for an unsolicited error frame, stashing events on the way.
    async fn error(&mut self) -> Value {
        loop {
            let frame = self.next_frame().await;
            if frame["body"]["type"] == "Error" {
                return frame["body"]["data"].clone();
            }
            assert_eq!(frame["body"]["type"], "Event", "unexpected frame: {frame}");
            self.stash.push_back(frame["body"]["data"].clone());
        }
    }
}

async fn start_server(limits: RoomLimits) -> std::net::SocketAddr {
    let server = SignalServer::builder()
        .bind("127.0.0.1:0")
        .limits(limits)
        .build(LoopbackEngine::new())
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("bound address");
    tokio::spawn(server.run());
    addr
}

#[tokio::test]
async fn test_admission_snapshot_arrives_first_with_slot() {
    let addr = start_server(RoomLimits::default()).await;
    let mut client = TestClient::connect(addr).await;

    let snapshot = client.admitted().await;
    assert_eq!(snapshot["slot"], 0);
    assert_eq!(snapshot["roster"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_peer_join_and_rename_fan_out() {
    let addr = start_server(RoomLimits::default()).await;
    let mut a = TestClient::connect(addr).await;
    a.admitted().await;

    let mut b = TestClient::connect(addr).await;
    let snapshot = b.admitted().await;
    assert_eq!(snapshot["slot"], 1);

    let joined = a.event("PeerJoined").await;
    assert_eq!(joined["participant"]["slot"], 1);

    let body = b.request(json!({ "type": "Rename", "name": "ada" })).await;
    assert_eq!(body["data"]["type"], "Renamed");

    let renamed = a.event("PeerRenamed").await;
    assert_eq!(renamed["name"], "ada");
}

#[tokio::test]
async fn test_full_media_negotiation_cycle() {
    let addr = start_server(RoomLimits::default()).await;
    let mut a = TestClient::connect(addr).await;
    a.admitted().await;
    let mut b = TestClient::connect(addr).await;
    b.admitted().await;

    let caps = a.request(json!({ "type": "Capabilities" })).await;
    assert_eq!(caps["data"]["type"], "Capabilities");
    assert!(caps["data"]["caps"]["codecs"].is_array());

    let created = a
        .request(json!({ "type": "CreateTransport", "direction": "send" }))
        .await;
    assert_eq!(created["data"]["type"], "TransportCreated");
    let transport_id = created["data"]["transport"]["id"].as_str().unwrap().to_owned();

    let connected = a
        .request(json!({
            "type": "ConnectTransport",
            "transport_id": transport_id,
            "handshake": { "dtls": {} },
        }))
        .await;
    assert_eq!(connected["data"]["type"], "TransportConnected");

    let produced = a
        .request(json!({
            "type": "CreateProducer",
            "transport_id": transport_id,
            "kind": "video",
            "source": "screen",
            "rtp_params": { "codecs": [] },
        }))
        .await;
    assert_eq!(produced["data"]["type"], "ProducerCreated");
    assert_eq!(produced["data"]["slot"], 0);
    let producer_id = produced["data"]["producer_id"].as_str().unwrap().to_owned();

    // The share is announced to everyone, the owner included.
    let started_a = a.event("PresentationStarted").await;
    let started_b = b.event("PresentationStarted").await;
    assert_eq!(started_a["presentation"]["slot"], 0);
    assert_eq!(started_b["presentation"]["producer_id"], producer_id.as_str());

    // Peer consumes it over a receive transport.
    let recv = b
        .request(json!({ "type": "CreateTransport", "direction": "recv" }))
        .await;
    let recv_id = recv["data"]["transport"]["id"].as_str().unwrap().to_owned();
    let consumed = b
        .request(json!({
            "type": "Consume",
            "transport_id": recv_id,
            "producer_id": producer_id,
            "caps": { "codecs": [] },
        }))
        .await;
    assert_eq!(consumed["data"]["type"], "Consumed");
    assert_eq!(consumed["data"]["consumer"]["producer_id"], producer_id.as_str());

    // Owner stops sharing; both sides see the end delta.
    let stopped = a.request(json!({ "type": "StopScreenShare" })).await;
    assert_eq!(stopped["data"]["ended"], 1);
    let ended = b.event("PresentationEnded").await;
    assert_eq!(ended["slot"], 0);
}

#[tokio::test]
async fn test_request_errors_carry_codes_and_seq() {
    let addr = start_server(RoomLimits::default()).await;
    let mut client = TestClient::connect(addr).await;
    client.admitted().await;

    let recv = client
        .request(json!({ "type": "CreateTransport", "direction": "recv" }))
        .await;
    let recv_id = recv["data"]["transport"]["id"].as_str().unwrap().to_owned();

    let body = client
        .request(json!({
            "type": "Consume",
            "transport_id": recv_id,
            "producer_id": "prd-missing",
            "caps": {},
        }))
        .await;
    assert_eq!(body["type"], "Error");
    assert_eq!(body["data"]["code"], 404);
}

#[tokio::test]
async fn test_malformed_frame_gets_400_and_connection_survives() {
    let addr = start_server(RoomLimits::default()).await;
    let mut client = TestClient::connect(addr).await;
    client.admitted().await;

    client
        .ws
        .send(Message::Text("not json".to_owned().into()))
        .await
        .unwrap();
    let err = client.error().await;
    assert_eq!(err["code"], 400);

    // The connection still serves requests.
    let body = client.request(json!({ "type": "Capabilities" })).await;
    assert_eq!(body["data"]["type"], "Capabilities");
}

#[tokio::test]
async fn test_room_full_rejects_with_403_and_close() {
    let addr = start_server(RoomLimits {
        max_users: 1,
        max_presentations: 1,
    })
    .await;
    let mut a = TestClient::connect(addr).await;
    a.admitted().await;

    let mut b = TestClient::connect(addr).await;
    let frame = b.next_frame().await;
    assert_eq!(frame["body"]["type"], "Error");
    assert_eq!(frame["body"]["data"]["code"], 403);

    // The server closes the rejected connection.
    loop {
        match b.ws.next().await {
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(_)) => break,
        }
    }
}

#[tokio::test]
async fn test_abrupt_disconnect_cleans_up_presentations() {
    let addr = start_server(RoomLimits::default()).await;
    let mut a = TestClient::connect(addr).await;
    a.admitted().await;
    let mut b = TestClient::connect(addr).await;
    b.admitted().await;

    let created = a
        .request(json!({ "type": "CreateTransport", "direction": "send" }))
        .await;
    let transport_id = created["data"]["transport"]["id"].as_str().unwrap().to_owned();
    a.request(json!({
        "type": "CreateProducer",
        "transport_id": transport_id,
        "kind": "video",
        "source": "screen",
        "rtp_params": {},
    }))
    .await;
    b.event("PresentationStarted").await;

    // A vanishes without a leave request.
    drop(a);

    let ended = b.event("PresentationEnded").await;
    assert_eq!(ended["slot"], 0);
    b.event("PeerLeft").await;
}

#[tokio::test]
async fn test_explicit_leave_replies_then_notifies_peers() {
    let addr = start_server(RoomLimits::default()).await;
    let mut a = TestClient::connect(addr).await;
    a.admitted().await;
    let mut b = TestClient::connect(addr).await;
    b.admitted().await;
    a.event("PeerJoined").await;

    let body = b.request(json!({ "type": "Leave" })).await;
    assert_eq!(body["data"]["type"], "Left");

    a.event("PeerLeft").await;
    // Occupancy summaries stashed before the leave are stale; the
    // post-leave one is still on the wire (it follows PeerLeft).
    a.stash.clear();
    let status = a.event("RoomStatus").await;
    assert_eq!(status["user_count"], 1);
}
