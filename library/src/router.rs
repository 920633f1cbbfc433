/*!
Addressing rules of the relay.

The controller has to name the peer every message is for; a peer can only ever talk
to the controller, and always under its own identity.
 */

use peer_relay_protocol::{PeerId, SignalingMessage};

use crate::error::RoutingError;
use crate::registry::Registry;

/// Who sent a message into the relay.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Origin {
    Controller,
    Peer(PeerId),
}

impl Origin {
    #[must_use]
    pub const fn peer_id(&self) -> Option<&PeerId> {
        match self {
            Self::Controller => None,
            Self::Peer(peer_id) => Some(peer_id),
        }
    }
}

/// Where a message has to go.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Route {
    /// To one peer's transport.
    Peer(PeerId, SignalingMessage),
    /// To the controller's transport, with the sending peer's identity attached.
    Controller(SignalingMessage),
    /// To every registered peer.
    Broadcast(SignalingMessage),
    /// Nowhere: diagnostic output to be logged by the relay.
    Log {
        peer_id: Option<PeerId>,
        message: String,
    },
}

impl Route {
    /// Peer whose session the routed message belongs to.
    #[must_use]
    pub const fn session<'a>(&'a self, origin: &'a Origin) -> Option<&'a PeerId> {
        match self {
            Self::Peer(peer_id, _) => Some(peer_id),
            Self::Controller(_) => origin.peer_id(),
            Self::Broadcast(_) | Self::Log { .. } => None,
        }
    }

    #[must_use]
    pub const fn message(&self) -> Option<&SignalingMessage> {
        match self {
            Self::Peer(_, message) | Self::Controller(message) | Self::Broadcast(message) => {
                Some(message)
            }
            Self::Log { .. } => None,
        }
    }
}

/// A peer that put someone else's identity on its message.
///
/// The message is still delivered, under the sender's real identity.
#[must_use]
pub fn impersonation(origin: &Origin, message: &SignalingMessage) -> Option<RoutingError> {
    match (origin, message.peer_id()) {
        (Origin::Peer(actual), Some(claimed)) if claimed != actual => {
            Some(RoutingError::Impersonation {
                claimed: claimed.clone(),
                actual: actual.clone(),
            })
        }
        _ => None,
    }
}

/// Work out the destination of `message`.
///
/// Pure: validates addressing against the registry but neither checks negotiation
/// phases nor touches any transport.
///
/// # Errors
/// [`RoutingError`] when the target is unknown or missing, no controller is connected,
/// or someone other than the relay authored a connect/disconnect notice.
pub fn route(
    origin: &Origin,
    message: SignalingMessage,
    registry: &Registry,
) -> Result<Route, RoutingError> {
    match message {
        SignalingMessage::ClientConnect(_) | SignalingMessage::ClientDisconnect(_) => {
            return Err(RoutingError::Forged {
                message_type: message.type_name(),
            });
        }
        SignalingMessage::Log { message, peer_id } => {
            return Ok(Route::Log {
                peer_id: origin.peer_id().cloned().or(peer_id),
                message,
            });
        }
        _ => {}
    }

    match origin {
        Origin::Peer(peer_id) => {
            if registry.controller().is_none() {
                return Err(RoutingError::NoController);
            }
            Ok(Route::Controller(message.with_peer_id(peer_id.clone())))
        }
        Origin::Controller => match message.peer_id().cloned() {
            Some(target) => {
                registry.lookup(&target)?;
                Ok(Route::Peer(target, message))
            }
            None => match message {
                SignalingMessage::OtherText { .. } | SignalingMessage::OtherBinary { .. } => {
                    Ok(Route::Broadcast(message))
                }
                _ => Err(RoutingError::MissingTarget {
                    message_type: message.type_name(),
                }),
            },
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::{Connection, OutboundFrames};
    use peer_relay_protocol::{Description, IceCandidate};

    struct Fixture {
        registry: Registry,
        _frames: Vec<OutboundFrames>,
    }

    fn fixture(with_controller: bool, peers: &[&str]) -> Fixture {
        let mut registry = Registry::new();
        let mut frames = Vec::new();
        if with_controller {
            let (connection, outbound) = Connection::new();
            registry.register_controller(connection);
            frames.push(outbound);
        }
        for peer in peers {
            let (connection, outbound) = Connection::new();
            registry.register_peer(PeerId::from(*peer), connection);
            frames.push(outbound);
        }
        Fixture {
            registry,
            _frames: frames,
        }
    }

    fn candidate() -> IceCandidate {
        IceCandidate::new("candidate:1 1 UDP 2122260223 10.0.0.1 5000 typ host", "0", 0).unwrap()
    }

    #[test]
    fn test_controller_message_goes_to_named_peer() {
        let fixture = fixture(true, &["p1", "p2"]);
        let message: SignalingMessage = Description::offer("v=0")
            .unwrap()
            .with_peer_id(PeerId::from("p1"))
            .into();
        assert_eq!(
            route(&Origin::Controller, message.clone(), &fixture.registry).unwrap(),
            Route::Peer(PeerId::from("p1"), message)
        );
    }

    #[test]
    fn test_unknown_target_is_not_found() {
        let fixture = fixture(true, &["p1"]);
        let message = Description::offer("v=0")
            .unwrap()
            .with_peer_id(PeerId::from("p404"))
            .into();
        assert!(matches!(
            route(&Origin::Controller, message, &fixture.registry),
            Err(RoutingError::NotFound(peer_id)) if peer_id == PeerId::from("p404")
        ));
    }

    #[test]
    fn test_controller_negotiation_needs_target() {
        let fixture = fixture(true, &["p1"]);
        assert!(matches!(
            route(&Origin::Controller, candidate().into(), &fixture.registry),
            Err(RoutingError::MissingTarget {
                message_type: "candidate"
            })
        ));
    }

    #[test]
    fn test_untargeted_controller_data_is_broadcast() {
        let fixture = fixture(true, &["p1"]);
        let message = SignalingMessage::OtherBinary {
            payload: vec![7],
            peer_id: None,
        };
        assert_eq!(
            route(&Origin::Controller, message.clone(), &fixture.registry).unwrap(),
            Route::Broadcast(message)
        );
    }

    #[test]
    fn test_peer_identity_is_injected() {
        let fixture = fixture(true, &["p1", "p2"]);
        let origin = Origin::Peer(PeerId::from("p1"));
        let forged: SignalingMessage = candidate().with_peer_id(PeerId::from("p2")).into();

        assert!(matches!(
            impersonation(&origin, &forged),
            Some(RoutingError::Impersonation { .. })
        ));
        let routed = route(&origin, forged, &fixture.registry).unwrap();
        assert_eq!(
            routed,
            Route::Controller(candidate().with_peer_id(PeerId::from("p1")).into())
        );
        assert_eq!(routed.session(&origin), Some(&PeerId::from("p1")));
    }

    #[test]
    fn test_own_identity_is_not_impersonation() {
        let origin = Origin::Peer(PeerId::from("p1"));
        let message = candidate().with_peer_id(PeerId::from("p1")).into();
        assert!(impersonation(&origin, &message).is_none());
        assert!(impersonation(&origin, &candidate().into()).is_none());
    }

    #[test]
    fn test_peer_without_controller() {
        let fixture = fixture(false, &["p1"]);
        assert!(matches!(
            route(
                &Origin::Peer(PeerId::from("p1")),
                candidate().into(),
                &fixture.registry
            ),
            Err(RoutingError::NoController)
        ));
    }

    #[test]
    fn test_connect_notices_cannot_be_authored() {
        let fixture = fixture(true, &["p1"]);
        for origin in [Origin::Controller, Origin::Peer(PeerId::from("p1"))] {
            assert!(matches!(
                route(
                    &origin,
                    SignalingMessage::ClientConnect(PeerId::from("p1")),
                    &fixture.registry
                ),
                Err(RoutingError::Forged { .. })
            ));
        }
    }

    #[test]
    fn test_log_is_never_delivered() {
        let fixture = fixture(true, &["p1"]);
        let routed = route(
            &Origin::Peer(PeerId::from("p1")),
            SignalingMessage::Log {
                message: "ice checking".to_owned(),
                peer_id: None,
            },
            &fixture.registry,
        )
        .unwrap();
        assert_eq!(
            routed,
            Route::Log {
                peer_id: Some(PeerId::from("p1")),
                message: "ice checking".to_owned()
            }
        );
        assert!(routed.message().is_none());
    }
}
