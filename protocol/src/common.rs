use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque identifier of one remote peer for the lifetime of its transport connection.
///
/// The relay issues one to each peer that connects; a peer may ask for a specific one
/// when reconnecting, in which case the stale connection holding it is taken over.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wrap String into a `PeerId` `struct`
    #[must_use]
    pub const fn new(inner: String) -> Self {
        Self(inner)
    }

    /// Return reference to the underling string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Acquire the underlying type
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for PeerId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl From<&str> for PeerId {
    fn from(val: &str) -> Self {
        Self(val.to_owned())
    }
}

impl From<String> for PeerId {
    fn from(val: String) -> Self {
        Self(val)
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two session descriptions a [`Description`](crate::Description) carries.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SdpKind {
    /// Sent by the side that starts (or restarts) a negotiation.
    Offer,
    /// Sent in reply to an offer.
    Answer,
}

impl SdpKind {
    /// Value of the wire `type` field for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
        }
    }
}

impl Display for SdpKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
