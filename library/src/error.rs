use peer_relay_protocol::{DecodeError, MessageError, PeerId};
use thiserror::Error;

use crate::negotiation::Rejection;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned to callers of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Failure to move a frame across a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection is closed")]
    Closed,

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid subprotocol `{0}`")]
    InvalidSubprotocol(String),
}

/// A message could not be delivered to where it was addressed.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no peer registered as `{0}`")]
    NotFound(PeerId),

    #[error("`{message_type}` from the controller must name a target peer")]
    MissingTarget { message_type: &'static str },

    #[error("no controller is connected")]
    NoController,

    #[error("peer `{actual}` claimed to be `{claimed}`")]
    Impersonation { claimed: PeerId, actual: PeerId },

    #[error("`{message_type}` notices are only issued by the relay")]
    Forged { message_type: &'static str },
}

/// Everything the relay reports on its error channel.
///
/// None of these end the relay or affect sessions other than the one named.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("dropped undecodable frame from {}: {source}", describe(.peer_id.as_ref()))]
    Decode {
        peer_id: Option<PeerId>,
        #[source]
        source: DecodeError,
    },

    #[error("could not route message from {}: {source}", describe(.peer_id.as_ref()))]
    Routing {
        peer_id: Option<PeerId>,
        #[source]
        source: RoutingError,
    },

    #[error("protocol violation in session with `{peer_id}`: {rejection}")]
    ProtocolViolation { peer_id: PeerId, rejection: Rejection },

    #[error("transport failure towards {}: {source}", describe(.peer_id.as_ref()))]
    Transport {
        peer_id: Option<PeerId>,
        #[source]
        source: TransportError,
    },
}

impl RelayError {
    /// Identity the error concerns; `None` means the controller or an unknown sender.
    #[must_use]
    pub const fn peer_id(&self) -> Option<&PeerId> {
        match self {
            Self::Decode { peer_id, .. }
            | Self::Routing { peer_id, .. }
            | Self::Transport { peer_id, .. } => peer_id.as_ref(),
            Self::ProtocolViolation { peer_id, .. } => Some(peer_id),
        }
    }
}

fn describe(peer_id: Option<&PeerId>) -> String {
    peer_id.map_or_else(|| "the controller".to_owned(), |peer_id| format!("peer `{peer_id}`"))
}
