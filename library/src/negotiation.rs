/*!
Per-session offer/answer sequencing.

An answer or a candidate is meaningless before its offer, so the relay tracks where
each controller-peer session is and drops messages that arrive out of order.
A new offer is accepted in every phase and restarts the negotiation.
 */

use std::fmt::{Display, Formatter};

use peer_relay_protocol::{SdpKind, SignalingMessage};

/// Where a session is in the offer/answer exchange.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Phase {
    /// No offer seen yet.
    #[default]
    Idle,
    /// An offer is outstanding.
    Offered,
    /// The offer was answered; candidates may keep trickling.
    Answered,
    /// The media layer reported the connection as established.
    Connected,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Offered => "offered",
            Self::Answered => "answered",
            Self::Connected => "connected",
        })
    }
}

/// Why a message was not allowed in the current phase.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Rejection {
    NoPendingOffer,
    NoSession,
    DuplicateAnswer,
    AlreadyConnected,
    NotAnswered,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NoPendingOffer => "no pending offer",
            Self::NoSession => "no session",
            Self::DuplicateAnswer => "duplicate answer",
            Self::AlreadyConnected => "answer after connection was established",
            Self::NotAnswered => "offer has not been answered",
        })
    }
}

/// Phase a session moves to when `message` passes through it.
///
/// Messages that take no part in the negotiation leave the phase untouched.
///
/// # Errors
/// The [`Rejection`] for an answer or candidate that the phase does not allow.
pub fn transition(phase: Phase, message: &SignalingMessage) -> Result<Phase, Rejection> {
    match message {
        SignalingMessage::Description(description) => match (description.kind(), phase) {
            (SdpKind::Offer, _) => Ok(Phase::Offered),
            (SdpKind::Answer, Phase::Idle) => Err(Rejection::NoPendingOffer),
            (SdpKind::Answer, Phase::Offered) => Ok(Phase::Answered),
            (SdpKind::Answer, Phase::Answered) => Err(Rejection::DuplicateAnswer),
            (SdpKind::Answer, Phase::Connected) => Err(Rejection::AlreadyConnected),
        },
        SignalingMessage::Candidate(_) => match phase {
            Phase::Idle => Err(Rejection::NoSession),
            Phase::Offered | Phase::Answered | Phase::Connected => Ok(phase),
        },
        SignalingMessage::ClientConnect(_)
        | SignalingMessage::ClientDisconnect(_)
        | SignalingMessage::Log { .. }
        | SignalingMessage::OtherText { .. }
        | SignalingMessage::OtherBinary { .. } => Ok(phase),
    }
}

/// Phase after the media layer reports the connection as established.
///
/// # Errors
/// [`Rejection::NotAnswered`] unless the session has been answered.
pub const fn connected(phase: Phase) -> Result<Phase, Rejection> {
    match phase {
        Phase::Answered | Phase::Connected => Ok(Phase::Connected),
        Phase::Idle | Phase::Offered => Err(Rejection::NotAnswered),
    }
}
