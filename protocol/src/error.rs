use thiserror::Error;

use crate::SdpKind;

/// A message could not be built because a required field is missing or out of range.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum MessageError {
    #[error("sdp of {kind} is empty")]
    EmptySdp { kind: SdpKind },

    #[error("sdpMid is empty")]
    EmptySdpMid,

    #[error("sdpMLineIndex {0} is not a valid media line index")]
    InvalidSdpMLineIndex(i64),
}

/// An inbound frame looked like a signaling object but could not be turned into one.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed signaling object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{message_type}` message is missing `{field}`")]
    MissingField {
        message_type: &'static str,
        field: &'static str,
    },

    #[error("invalid signaling message: {0}")]
    Invalid(#[from] MessageError),
}
