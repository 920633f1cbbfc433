use log::error;
use peer_relay_protocol::{IceCandidate, PeerId};

/// The media-negotiation layer a [`Controller`](super::Controller) hands signaling to.
///
/// Payloads are passed through as received; the relay never looks inside them.
/// Engines that produce their own offers asynchronously, or gather local candidates,
/// push them back through a [`ControllerHandle`](super::ControllerHandle).
pub trait MediaHandler: Send {
    /// A peer joined; a session with it can be set up.
    fn on_peer_connected(&mut self, peer_id: &PeerId);

    /// Produce the local offer for `peer_id`, called right after [`Self::on_peer_connected`].
    ///
    /// # Errors
    /// Whatever kept the engine from producing an offer; it is passed to [`Self::on_error`].
    fn on_offer_needed(&mut self, peer_id: &PeerId) -> anyhow::Result<String>;

    fn on_answer_received(&mut self, peer_id: &PeerId, sdp: &str);

    fn on_candidate_received(&mut self, peer_id: &PeerId, candidate: &IceCandidate);

    fn on_peer_disconnected(&mut self, peer_id: &PeerId);

    /// Text that is not part of the signaling protocol.
    fn on_text(&mut self, _peer_id: Option<&PeerId>, _payload: &str) {}

    /// Binary data, relayed as is.
    fn on_binary(&mut self, _peer_id: Option<&PeerId>, _payload: &[u8]) {}

    fn on_error(&mut self, peer_id: Option<&PeerId>, error: &anyhow::Error) {
        match peer_id {
            Some(peer_id) => error!("signaling error for peer `{}`: {:#}", peer_id, error),
            None => error!("signaling error: {:#}", error),
        }
    }
}
