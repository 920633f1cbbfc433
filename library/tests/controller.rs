use std::time::Duration;

use anyhow::anyhow;
use peer_relay::controller::{Controller, MediaHandler};
use peer_relay::negotiation::Phase;
use peer_relay::transport::{Connection, OutboundFrames};
use peer_relay::{Description, IceCandidate, PeerId, Relay, RelayConfig, SignalingMessage};
use peer_relay_protocol::{decode, encode};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Connected(String),
    Answer(String, String),
    Candidate(String, String),
    Disconnected(String),
    Text(String),
    Error(String),
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
    refuse_offers: bool,
}

impl MediaHandler for Recorder {
    fn on_peer_connected(&mut self, peer_id: &PeerId) {
        self.events.push(Event::Connected(peer_id.to_string()));
    }

    fn on_offer_needed(&mut self, peer_id: &PeerId) -> anyhow::Result<String> {
        if self.refuse_offers {
            return Err(anyhow!("no media engine"));
        }
        Ok(format!("v=0\r\ns=offer for {}", peer_id))
    }

    fn on_answer_received(&mut self, peer_id: &PeerId, sdp: &str) {
        self.events
            .push(Event::Answer(peer_id.to_string(), sdp.to_owned()));
    }

    fn on_candidate_received(&mut self, peer_id: &PeerId, candidate: &IceCandidate) {
        self.events.push(Event::Candidate(
            peer_id.to_string(),
            candidate.candidate().to_owned(),
        ));
    }

    fn on_peer_disconnected(&mut self, peer_id: &PeerId) {
        self.events.push(Event::Disconnected(peer_id.to_string()));
    }

    fn on_text(&mut self, _peer_id: Option<&PeerId>, payload: &str) {
        self.events.push(Event::Text(payload.to_owned()));
    }

    fn on_error(&mut self, _peer_id: Option<&PeerId>, error: &anyhow::Error) {
        self.events.push(Event::Error(format!("{:#}", error)));
    }
}

async fn next_message(frames: &mut OutboundFrames) -> SignalingMessage {
    let frame = tokio::time::timeout(Duration::from_secs(1), frames.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection closed");
    decode(frame).unwrap()
}

#[tokio::test]
async fn embedded_controller_negotiates_with_a_peer() {
    let (relay, _reports) = Relay::new(RelayConfig::default());
    let (handle, frames) = relay.attach_controller().await;
    let controller = Controller::new(handle, frames, Recorder::default());
    let handle = controller.handle();
    let running = tokio::spawn(controller.run());

    let (peer, mut peer_frames) = Connection::new();
    let p1 = relay.connect_peer(Some(PeerId::from("p1")), peer.clone()).await;

    match next_message(&mut peer_frames).await {
        SignalingMessage::Description(offer) => {
            assert_eq!(offer.sdp(), "v=0\r\ns=offer for p1");
            assert_eq!(offer.peer_id(), Some(&p1));
        }
        other => panic!("expected offer, got {:?}", other),
    }
    assert_eq!(relay.phase(&p1).await, Some(Phase::Offered));

    let answer = encode(&Description::answer("v=0\r\ns=answer").unwrap().into()).unwrap();
    relay.peer_frame(&p1, peer.id(), answer).await;
    let candidate = IceCandidate::new("candidate:0 1 UDP 1 10.0.0.2 9 typ host", "0", 0).unwrap();
    relay
        .peer_frame(&p1, peer.id(), encode(&candidate.into()).unwrap())
        .await;

    handle
        .send_candidate(&p1, "candidate:1 1 UDP 2 10.0.0.1 9 typ host", "0", 0)
        .unwrap();
    assert!(matches!(
        next_message(&mut peer_frames).await,
        SignalingMessage::Candidate(_)
    ));

    relay.disconnect_peer(&p1, peer.id()).await;
    // everything above is queued before the detach, so run() sees it all
    handle.close();
    let recorder = tokio::time::timeout(Duration::from_secs(1), running)
        .await
        .expect("controller did not stop")
        .unwrap();

    assert_eq!(
        recorder.events,
        vec![
            Event::Connected("p1".to_owned()),
            Event::Answer("p1".to_owned(), "v=0\r\ns=answer".to_owned()),
            Event::Candidate(
                "p1".to_owned(),
                "candidate:0 1 UDP 1 10.0.0.2 9 typ host".to_owned()
            ),
            Event::Disconnected("p1".to_owned()),
        ]
    );
    assert!(!relay.has_controller().await);
}

#[tokio::test]
async fn failed_offer_is_reported_to_the_handler() {
    let (relay, _reports) = Relay::new(RelayConfig::default());
    let (handle, frames) = relay.attach_controller().await;
    let recorder = Recorder {
        refuse_offers: true,
        ..Recorder::default()
    };
    let running = tokio::spawn(Controller::new(handle.clone(), frames, recorder).run());

    let (peer, mut peer_frames) = Connection::new();
    relay.connect_peer(Some(PeerId::from("p1")), peer).await;
    let nothing = tokio::time::timeout(Duration::from_millis(50), peer_frames.next()).await;
    assert!(nothing.is_err());

    handle.close();
    let recorder = running.await.unwrap();
    assert_eq!(recorder.events.len(), 2);
    assert_eq!(recorder.events[0], Event::Connected("p1".to_owned()));
    assert!(matches!(
        &recorder.events[1],
        Event::Error(message) if message.contains("no media engine")
    ));
}

#[tokio::test]
async fn controller_text_reaches_peers_and_peer_text_reaches_the_handler() {
    let (relay, _reports) = Relay::new(RelayConfig::default());
    let (handle, frames) = relay.attach_controller().await;
    let running = tokio::spawn(Controller::new(handle.clone(), frames, Recorder::default()).run());

    let (peer, mut peer_frames) = Connection::new();
    let p1 = relay.connect_peer(Some(PeerId::from("p1")), peer.clone()).await;
    // the offer produced on connect
    next_message(&mut peer_frames).await;

    handle.send_text("welcome").unwrap();
    assert_eq!(
        next_message(&mut peer_frames).await,
        SignalingMessage::OtherText {
            payload: "welcome".to_owned(),
            peer_id: None
        }
    );

    relay
        .peer_frame(&p1, peer.id(), peer_relay::Frame::Text("ready".to_owned()))
        .await;

    handle.close();
    let recorder = running.await.unwrap();
    assert_eq!(recorder.events.last(), Some(&Event::Text("ready".to_owned())));
}
