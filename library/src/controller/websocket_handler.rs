use anyhow::anyhow;
use log::{debug, warn};
use peer_relay_protocol::{SdpKind, SignalingMessage};

use crate::controller::callbacks::MediaHandler;
use crate::controller::ControllerHandle;

/// Controller half of the negotiation: every relayed message becomes a call into the
/// media layer, and a newly connected peer immediately gets an offer.
pub(crate) fn handle_signaling_message<H: MediaHandler>(
    handler: &mut H,
    handle: &ControllerHandle,
    message: SignalingMessage,
) {
    match message {
        SignalingMessage::ClientConnect(peer_id) => {
            debug!("peer `{}` connected, creating offer", peer_id);
            handler.on_peer_connected(&peer_id);
            let sent = handler
                .on_offer_needed(&peer_id)
                .and_then(|sdp| handle.send_offer(&peer_id, sdp).map_err(anyhow::Error::from));
            if let Err(error) = sent {
                handler.on_error(Some(&peer_id), &error.context("failed to send offer"));
            }
        }
        SignalingMessage::ClientDisconnect(peer_id) => {
            debug!("peer `{}` disconnected", peer_id);
            handler.on_peer_disconnected(&peer_id);
        }
        SignalingMessage::Description(description) => {
            let Some(peer_id) = description.peer_id() else {
                return handler.on_error(None, &anyhow!("{} without clientId", description.kind()));
            };
            match description.kind() {
                SdpKind::Answer => handler.on_answer_received(peer_id, description.sdp()),
                SdpKind::Offer => warn!("ignoring offer from peer `{}`, controller offers", peer_id),
            }
        }
        SignalingMessage::Candidate(candidate) => match candidate.peer_id() {
            Some(peer_id) => handler.on_candidate_received(peer_id, &candidate),
            None => handler.on_error(None, &anyhow!("candidate without clientId")),
        },
        SignalingMessage::Log { message, peer_id } => {
            debug!("log from {:?}: {}", peer_id, message);
        }
        SignalingMessage::OtherText { payload, peer_id } => {
            handler.on_text(peer_id.as_ref(), &payload);
        }
        SignalingMessage::OtherBinary { payload, peer_id } => {
            handler.on_binary(peer_id.as_ref(), &payload);
        }
    }
}
