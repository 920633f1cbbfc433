/*!
Typed signaling messages exchanged between the controller, the relay and the peers.

Session descriptions and candidates are opaque payloads: the relay checks that the
fields it needs for routing and sequencing are present, and nothing more.
 */

use crate::codec::stamp_client_id;
use crate::error::MessageError;
use crate::{PeerId, SdpKind};

/// `SDP` offer or answer that gets passed to the other side without modifications.
///
/// Can only be built through [`Description::new`], so an empty `sdp` never reaches the wire.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Description {
    kind: SdpKind,
    sdp: String,
    peer_id: Option<PeerId>,
}

impl Description {
    /// Build a description, rejecting a blank `sdp`.
    ///
    /// # Errors
    /// [`MessageError::EmptySdp`] when `sdp` is empty or whitespace only.
    pub fn new(kind: SdpKind, sdp: impl Into<String>) -> Result<Self, MessageError> {
        let sdp = sdp.into();
        if sdp.trim().is_empty() {
            return Err(MessageError::EmptySdp { kind });
        }
        Ok(Self {
            kind,
            sdp,
            peer_id: None,
        })
    }

    /// Shorthand for an [`SdpKind::Offer`] description.
    ///
    /// # Errors
    /// See [`Description::new`].
    pub fn offer(sdp: impl Into<String>) -> Result<Self, MessageError> {
        Self::new(SdpKind::Offer, sdp)
    }

    /// Shorthand for an [`SdpKind::Answer`] description.
    ///
    /// # Errors
    /// See [`Description::new`].
    pub fn answer(sdp: impl Into<String>) -> Result<Self, MessageError> {
        Self::new(SdpKind::Answer, sdp)
    }

    /// Address the description to (or mark it as coming from) `peer_id`.
    #[must_use]
    pub fn with_peer_id(mut self, peer_id: PeerId) -> Self {
        self.peer_id = Some(peer_id);
        self
    }

    #[must_use]
    pub const fn kind(&self) -> SdpKind {
        self.kind
    }

    #[must_use]
    pub fn sdp(&self) -> &str {
        &self.sdp
    }

    #[must_use]
    pub const fn peer_id(&self) -> Option<&PeerId> {
        self.peer_id.as_ref()
    }
}

/// Proposed ICE candidate of one side passed to the other side without modifications.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IceCandidate {
    candidate: String,
    sdp_mid: String,
    sdp_m_line_index: u16,
    peer_id: Option<PeerId>,
}

impl IceCandidate {
    /// Build a candidate, rejecting a blank `sdp_mid` or an out of range media line index.
    ///
    /// The `candidate` line itself may be empty: that is how end-of-candidates is signalled.
    ///
    /// # Errors
    /// [`MessageError::EmptySdpMid`] or [`MessageError::InvalidSdpMLineIndex`].
    pub fn new(
        candidate: impl Into<String>,
        sdp_mid: impl Into<String>,
        sdp_m_line_index: i64,
    ) -> Result<Self, MessageError> {
        let sdp_mid = sdp_mid.into();
        if sdp_mid.trim().is_empty() {
            return Err(MessageError::EmptySdpMid);
        }
        let sdp_m_line_index = u16::try_from(sdp_m_line_index)
            .map_err(|_| MessageError::InvalidSdpMLineIndex(sdp_m_line_index))?;
        Ok(Self {
            candidate: candidate.into(),
            sdp_mid,
            sdp_m_line_index,
            peer_id: None,
        })
    }

    /// Address the candidate to (or mark it as coming from) `peer_id`.
    #[must_use]
    pub fn with_peer_id(mut self, peer_id: PeerId) -> Self {
        self.peer_id = Some(peer_id);
        self
    }

    #[must_use]
    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    #[must_use]
    pub fn sdp_mid(&self) -> &str {
        &self.sdp_mid
    }

    #[must_use]
    pub const fn sdp_m_line_index(&self) -> u16 {
        self.sdp_m_line_index
    }

    #[must_use]
    pub const fn peer_id(&self) -> Option<&PeerId> {
        self.peer_id.as_ref()
    }
}

/// Everything that can travel over a signaling channel.
///
/// `peer_id` names the destination when the controller sends a message and the origin
/// when the relay forwards a peer's message to the controller. Peers never set it
/// themselves; the relay overwrites whatever they put there.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SignalingMessage {
    /// A peer joined the relay. Only ever produced by the relay itself.
    ClientConnect(PeerId),
    /// A peer left the relay. Only ever produced by the relay itself.
    ClientDisconnect(PeerId),
    /// Offer or answer.
    Description(Description),
    /// Trickled ICE candidate.
    Candidate(IceCandidate),
    /// Diagnostic line sent by a peer, logged by the relay and never forwarded.
    Log {
        message: String,
        peer_id: Option<PeerId>,
    },
    /// Any text frame that is not a recognised signaling object, passed through as is.
    OtherText {
        payload: String,
        peer_id: Option<PeerId>,
    },
    /// Any binary frame, passed through as is.
    OtherBinary {
        payload: Vec<u8>,
        peer_id: Option<PeerId>,
    },
}

impl SignalingMessage {
    /// The identity the message is addressed to or comes from, if any.
    #[must_use]
    pub const fn peer_id(&self) -> Option<&PeerId> {
        match self {
            Self::ClientConnect(peer_id) | Self::ClientDisconnect(peer_id) => Some(peer_id),
            Self::Description(description) => description.peer_id(),
            Self::Candidate(candidate) => candidate.peer_id(),
            Self::Log { peer_id, .. }
            | Self::OtherText { peer_id, .. }
            | Self::OtherBinary { peer_id, .. } => peer_id.as_ref(),
        }
    }

    /// Replace the identity carried by the message.
    ///
    /// A JSON object text payload has its `clientId` rewritten to match.
    #[must_use]
    pub fn with_peer_id(self, peer_id: PeerId) -> Self {
        match self {
            Self::ClientConnect(_) => Self::ClientConnect(peer_id),
            Self::ClientDisconnect(_) => Self::ClientDisconnect(peer_id),
            Self::Description(description) => Self::Description(description.with_peer_id(peer_id)),
            Self::Candidate(candidate) => Self::Candidate(candidate.with_peer_id(peer_id)),
            Self::Log { message, .. } => Self::Log {
                message,
                peer_id: Some(peer_id),
            },
            Self::OtherText { payload, .. } => Self::OtherText {
                payload: stamp_client_id(payload, &peer_id),
                peer_id: Some(peer_id),
            },
            Self::OtherBinary { payload, .. } => Self::OtherBinary {
                payload,
                peer_id: Some(peer_id),
            },
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::ClientConnect(_) => "clientconnect",
            Self::ClientDisconnect(_) => "clientclose",
            Self::Description(description) => description.kind().as_str(),
            Self::Candidate(_) => "candidate",
            Self::Log { .. } => "log",
            Self::OtherText { .. } => "text",
            Self::OtherBinary { .. } => "binary",
        }
    }
}

impl From<Description> for SignalingMessage {
    fn from(description: Description) -> Self {
        Self::Description(description)
    }
}

impl From<IceCandidate> for SignalingMessage {
    fn from(candidate: IceCandidate) -> Self {
        Self::Candidate(candidate)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_blank_sdp_is_rejected() {
        assert_eq!(
            Description::offer("  \r\n").unwrap_err(),
            MessageError::EmptySdp {
                kind: SdpKind::Offer
            }
        );
    }

    #[test]
    fn test_candidate_requires_sdp_mid() {
        assert_eq!(
            IceCandidate::new("candidate:1 1 UDP 1 1.2.3.4 5 typ host", "", 0).unwrap_err(),
            MessageError::EmptySdpMid
        );
    }

    #[test]
    fn test_negative_m_line_index_is_rejected() {
        assert_eq!(
            IceCandidate::new("candidate:1", "0", -1).unwrap_err(),
            MessageError::InvalidSdpMLineIndex(-1)
        );
    }

    #[test]
    fn test_end_of_candidates_is_accepted() {
        let candidate = IceCandidate::new("", "0", 0).unwrap();
        assert_eq!(candidate.candidate(), "");
    }

    #[test]
    fn test_with_peer_id_overwrites_identity() {
        let message = SignalingMessage::from(
            Description::answer("v=0").unwrap().with_peer_id(PeerId::from("p9")),
        )
        .with_peer_id(PeerId::from("p1"));
        assert_eq!(message.peer_id(), Some(&PeerId::from("p1")));
        assert_eq!(message.type_name(), "answer");
    }

    #[test]
    fn test_with_peer_id_rewrites_object_text() {
        let message = SignalingMessage::OtherText {
            payload: r#"{"type":"chat","clientId":"victim"}"#.to_owned(),
            peer_id: None,
        }
        .with_peer_id(PeerId::from("p1"));
        let SignalingMessage::OtherText { payload, .. } = message else {
            panic!("variant changed");
        };
        let object: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(object["clientId"], "p1");
        assert_eq!(object["type"], "chat");
    }
}
