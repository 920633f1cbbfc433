use std::net::TcpListener;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use peer_relay::controller::{self, ControllerHandle};
use peer_relay::transport::FrameStream;
use peer_relay::{PeerId, Relay, RelayConfig, SignalingMessage};
use peer_relay_protocol::decode;
use peer_relay_signaling_server::router::{create, ServerState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type PeerSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn start_server() -> (Relay, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let (relay, _reports) = Relay::new(RelayConfig::default());
    let routing = create(ServerState::new(relay.clone()), "/");
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(routing.into_make_service());
    tokio::spawn(server);

    (relay, format!("127.0.0.1:{}", port))
}

async fn connect_controller(address: &str) -> (ControllerHandle, FrameStream) {
    controller::connect(&format!("ws://{}/", address), "sender")
        .await
        .unwrap()
}

async fn connect_peer(address: &str, client_id: &str) -> PeerSocket {
    let (socket, _) =
        tokio_tungstenite::connect_async(format!("ws://{}/?clientId={}", address, client_id))
            .await
            .unwrap();
    socket
}

async fn next_signal(frames: &mut FrameStream) -> SignalingMessage {
    let frame = tokio::time::timeout(Duration::from_secs(2), frames.next())
        .await
        .expect("timed out waiting for the relay")
        .expect("relay closed the connection");
    decode(frame).unwrap()
}

async fn next_text(socket: &mut PeerSocket) -> String {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("timed out waiting for the relay")
            .expect("relay closed the connection")
            .unwrap();
        if let Message::Text(text) = message {
            return text;
        }
    }
}

#[tokio::test]
async fn test_health() {
    let (_relay, address) = start_server();
    let mut stream = TcpStream::connect(&address).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("OK"));
}

#[tokio::test]
async fn test_offer_answer_and_candidates_over_websocket() {
    let (relay, address) = start_server();
    let (handle, mut frames) = connect_controller(&address).await;

    let mut peer = connect_peer(&address, "p1").await;
    let p1 = PeerId::from("p1");
    assert_eq!(
        next_signal(&mut frames).await,
        SignalingMessage::ClientConnect(p1.clone())
    );

    handle.send_offer(&p1, "v=0\r\ns=offer").unwrap();
    let offer: serde_json::Value = serde_json::from_str(&next_text(&mut peer).await).unwrap();
    assert_eq!(offer["type"], "offer");
    assert_eq!(offer["sdp"], "v=0\r\ns=offer");
    assert_eq!(offer["clientId"], "p1");

    peer.send(Message::Text(
        r#"{"type":"answer","sdp":"v=0\r\ns=answer"}"#.to_owned(),
    ))
    .await
    .unwrap();
    match next_signal(&mut frames).await {
        SignalingMessage::Description(answer) => {
            assert_eq!(answer.sdp(), "v=0\r\ns=answer");
            assert_eq!(answer.peer_id(), Some(&p1));
        }
        other => panic!("expected answer, got {:?}", other),
    }

    peer.send(Message::Text(
        r#"{"type":"candidate","candidate":"candidate:1 1 UDP 2122260223 10.0.0.1 5000 typ host","sdpMid":"0","sdpMLineIndex":0,"clientId":"someone-else"}"#
            .to_owned(),
    ))
    .await
    .unwrap();
    match next_signal(&mut frames).await {
        SignalingMessage::Candidate(candidate) => {
            assert_eq!(candidate.sdp_m_line_index(), 0);
            assert_eq!(candidate.peer_id(), Some(&p1));
        }
        other => panic!("expected candidate, got {:?}", other),
    }

    peer.close(None).await.unwrap();
    assert_eq!(
        next_signal(&mut frames).await,
        SignalingMessage::ClientDisconnect(p1)
    );
    assert!(relay.peers().await.is_empty());
}

#[tokio::test]
async fn test_reconnecting_peer_takes_over_its_identity() {
    let (_relay, address) = start_server();
    let (_handle, mut frames) = connect_controller(&address).await;
    let p1 = PeerId::from("p1");

    let mut first = connect_peer(&address, "p1").await;
    assert_eq!(
        next_signal(&mut frames).await,
        SignalingMessage::ClientConnect(p1.clone())
    );

    let _second = connect_peer(&address, "p1").await;
    assert_eq!(
        next_signal(&mut frames).await,
        SignalingMessage::ClientDisconnect(p1.clone())
    );
    assert_eq!(
        next_signal(&mut frames).await,
        SignalingMessage::ClientConnect(p1)
    );

    // the old socket is closed by the relay
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(Ok(message)) = first.next().await {
            if message.is_close() {
                break;
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn test_late_controller_is_told_about_waiting_peers() {
    let (relay, address) = start_server();
    let _peer = connect_peer(&address, "early").await;
    while relay.peers().await.is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (_handle, mut frames) = connect_controller(&address).await;
    assert_eq!(
        next_signal(&mut frames).await,
        SignalingMessage::ClientConnect(PeerId::from("early"))
    );
    assert!(relay.has_controller().await);
}

#[tokio::test]
async fn test_controller_connect_fails_fast_without_relay() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let result = controller::connect(&format!("ws://{}/", address), "sender").await;
    assert!(result.is_err());
}
