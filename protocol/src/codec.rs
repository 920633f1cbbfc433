/*!
Conversion between raw transport frames and [`SignalingMessage`]s.

Text frames are only parsed when they look like a JSON object; everything else, and
every binary frame, is passed through untouched.
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::message::{Description, IceCandidate, SignalingMessage};
use crate::{PeerId, SdpKind};

const CLIENT_ID: &str = "clientId";

/// One message as it travels over the underlying channel.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Size of the payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identities arrive as strings from most clients, but as numbers from relays that
/// hand out sequential ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl From<WireId> for PeerId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(text) => Self::new(text),
            WireId::Number(number) => Self::new(number.to_string()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sdp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    candidate: Option<String>,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    sdp_m_line_index: Option<i64>,
    #[serde(rename = "clientId", default, skip_serializing_if = "Option::is_none")]
    client_id: Option<WireId>,
    #[serde(rename = "logMsg", default, skip_serializing_if = "Option::is_none")]
    log_msg: Option<String>,
}

impl WireMessage {
    fn typed(message_type: &str, peer_id: Option<&PeerId>) -> Self {
        Self {
            message_type: Some(message_type.to_owned()),
            client_id: peer_id.map(|peer_id| WireId::Text(peer_id.as_str().to_owned())),
            ..Self::default()
        }
    }
}

/// Turn a raw frame into a typed message.
///
/// # Errors
/// [`DecodeError`] when an object-shaped text frame is not valid JSON or a recognised
/// message type lacks one of its required fields.
pub fn decode(frame: Frame) -> Result<SignalingMessage, DecodeError> {
    match frame {
        Frame::Binary(payload) => Ok(SignalingMessage::OtherBinary {
            payload,
            peer_id: None,
        }),
        Frame::Text(text) => decode_text(text),
    }
}

const SIGNALING_TYPES: [&str; 7] = [
    "clientconnect",
    "clientclose",
    "clientdisconnect",
    "offer",
    "answer",
    "candidate",
    "log",
];

/// Lenient `clientId` lookup for objects that are not signaling messages.
fn client_id_of(object: &Map<String, Value>) -> Option<PeerId> {
    match object.get(CLIENT_ID)? {
        Value::String(id) => Some(PeerId::from(id.as_str())),
        Value::Number(id) => id.as_i64().map(|id| PeerId::from(id.to_string())),
        _ => None,
    }
}

/// Put `peer_id` into the `clientId` of an object-shaped text payload.
///
/// Payloads that are not JSON objects cannot carry an identity and are returned as is,
/// and so are objects that already name `peer_id`.
pub(crate) fn stamp_client_id(payload: String, peer_id: &PeerId) -> String {
    if !looks_like_object(&payload) {
        return payload;
    }
    let Ok(mut object) = serde_json::from_str::<Map<String, Value>>(payload.trim()) else {
        return payload;
    };
    if client_id_of(&object).as_ref() == Some(peer_id) {
        return payload;
    }
    object.insert(
        CLIENT_ID.to_owned(),
        Value::String(peer_id.as_str().to_owned()),
    );
    serde_json::to_string(&object).unwrap_or(payload)
}

fn looks_like_object(text: &str) -> bool {
    let text = text.trim();
    text.starts_with('{') && text.ends_with('}')
}

fn decode_text(text: String) -> Result<SignalingMessage, DecodeError> {
    if !looks_like_object(&text) {
        return Ok(SignalingMessage::OtherText {
            payload: text,
            peer_id: None,
        });
    }

    let object: Map<String, Value> = serde_json::from_str(text.trim())?;
    let is_signaling = object
        .get("type")
        .and_then(Value::as_str)
        .map_or(false, |message_type| SIGNALING_TYPES.contains(&message_type));
    if !is_signaling {
        return Ok(SignalingMessage::OtherText {
            peer_id: client_id_of(&object),
            payload: text,
        });
    }

    let wire: WireMessage = serde_json::from_value(Value::Object(object))?;
    let peer_id = wire.client_id.map(PeerId::from);

    let message = match wire.message_type.as_deref() {
        Some("clientconnect") => SignalingMessage::ClientConnect(peer_id.ok_or(
            DecodeError::MissingField {
                message_type: "clientconnect",
                field: "clientId",
            },
        )?),
        Some("clientclose" | "clientdisconnect") => SignalingMessage::ClientDisconnect(
            peer_id.ok_or(DecodeError::MissingField {
                message_type: "clientclose",
                field: "clientId",
            })?,
        ),
        Some("offer") => decode_description(SdpKind::Offer, wire.sdp, peer_id)?,
        Some("answer") => decode_description(SdpKind::Answer, wire.sdp, peer_id)?,
        Some("candidate") => {
            let sdp_mid = wire.sdp_mid.ok_or(DecodeError::MissingField {
                message_type: "candidate",
                field: "sdpMid",
            })?;
            let sdp_m_line_index = wire.sdp_m_line_index.ok_or(DecodeError::MissingField {
                message_type: "candidate",
                field: "sdpMLineIndex",
            })?;
            let candidate = IceCandidate::new(
                wire.candidate.unwrap_or_default(),
                sdp_mid,
                sdp_m_line_index,
            )?;
            SignalingMessage::Candidate(match peer_id {
                Some(peer_id) => candidate.with_peer_id(peer_id),
                None => candidate,
            })
        }
        Some("log") => SignalingMessage::Log {
            message: wire.log_msg.unwrap_or_default(),
            peer_id,
        },
        _ => SignalingMessage::OtherText {
            payload: text,
            peer_id,
        },
    };
    Ok(message)
}

fn decode_description(
    kind: SdpKind,
    sdp: Option<String>,
    peer_id: Option<PeerId>,
) -> Result<SignalingMessage, DecodeError> {
    let sdp = sdp.ok_or(DecodeError::MissingField {
        message_type: kind.as_str(),
        field: "sdp",
    })?;
    let description = Description::new(kind, sdp)?;
    Ok(SignalingMessage::Description(match peer_id {
        Some(peer_id) => description.with_peer_id(peer_id),
        None => description,
    }))
}

/// Turn a typed message into the frame that goes on the wire.
///
/// [`SignalingMessage::OtherText`] and [`SignalingMessage::OtherBinary`] payloads are
/// emitted verbatim, except that a JSON object payload gets the message's `peer_id` as
/// its `clientId`. The `peer_id` of any other text or binary payload only exists on
/// this side of the wire.
///
/// # Errors
/// Propagates the JSON serializer error, which does not happen for the shapes built here.
pub fn encode(message: &SignalingMessage) -> Result<Frame, serde_json::Error> {
    let wire = match message {
        SignalingMessage::ClientConnect(peer_id) => {
            WireMessage::typed("clientconnect", Some(peer_id))
        }
        SignalingMessage::ClientDisconnect(peer_id) => {
            WireMessage::typed("clientclose", Some(peer_id))
        }
        SignalingMessage::Description(description) => WireMessage {
            sdp: Some(description.sdp().to_owned()),
            ..WireMessage::typed(description.kind().as_str(), description.peer_id())
        },
        SignalingMessage::Candidate(candidate) => WireMessage {
            candidate: Some(candidate.candidate().to_owned()),
            sdp_mid: Some(candidate.sdp_mid().to_owned()),
            sdp_m_line_index: Some(i64::from(candidate.sdp_m_line_index())),
            ..WireMessage::typed("candidate", candidate.peer_id())
        },
        SignalingMessage::Log { message, peer_id } => WireMessage {
            log_msg: Some(message.clone()),
            ..WireMessage::typed("log", peer_id.as_ref())
        },
        SignalingMessage::OtherText { payload, peer_id } => {
            return Ok(Frame::Text(match peer_id {
                Some(peer_id) => stamp_client_id(payload.clone(), peer_id),
                None => payload.clone(),
            }))
        }
        SignalingMessage::OtherBinary { payload, .. } => {
            return Ok(Frame::Binary(payload.clone()))
        }
    };
    serde_json::to_string(&wire).map(Frame::Text)
}
