use std::fmt::Display;
use std::sync::Arc;

use futures_util::{Sink, Stream, StreamExt};
use log::{debug, info, warn};
use peer_relay_protocol::{decode, encode, Frame, PeerId, SignalingMessage};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::constants::DEFAULT_CONTROLLER_PROTOCOL;
use crate::controller::ControllerHandle;
use crate::error::{RelayError, RoutingError, TransportError};
use crate::negotiation::{self, Phase};
use crate::registry::Registry;
use crate::router::{self, Origin, Route};
use crate::transport::{self, Connection, ConnectionId, FrameStream};

/// Settings shared by the relay and the adapters around it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RelayConfig {
    /// WebSocket subprotocol that marks a connection as the controller.
    pub controller_protocol: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            controller_protocol: DEFAULT_CONTROLLER_PROTOCOL.to_owned(),
        }
    }
}

/// Receiving end of the relay's error channel.
#[derive(Debug)]
pub struct ErrorReports {
    rx: mpsc::UnboundedReceiver<RelayError>,
}

impl ErrorReports {
    /// Wait for the next report; `None` once every [`Relay`] handle is gone.
    pub async fn recv(&mut self) -> Option<RelayError> {
        self.rx.recv().await
    }

    /// Next report if one is already queued.
    pub fn try_recv(&mut self) -> Option<RelayError> {
        self.rx.try_recv().ok()
    }
}

#[derive(Debug)]
struct RelayInner {
    config: RelayConfig,
    registry: RwLock<Registry>,
    reports: mpsc::UnboundedSender<RelayError>,
}

/// The signaling relay: connection registry, router and negotiation state behind one lock.
///
/// Cheap to clone; every clone drives the same relay. Registry changes and message
/// dispatch run under the lock, and only ever queue frames on connections, so
/// notices and forwarded messages reach each transport in the order they were decided.
#[derive(Debug, Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

impl Relay {
    /// Create a relay and the channel its errors are reported on.
    #[must_use]
    pub fn new(config: RelayConfig) -> (Self, ErrorReports) {
        let (tx, rx) = mpsc::unbounded_channel();
        let relay = Self {
            inner: Arc::new(RelayInner {
                config,
                registry: RwLock::new(Registry::new()),
                reports: tx,
            }),
        };
        (relay, ErrorReports { rx })
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    fn report(&self, report: RelayError) {
        warn!("{}", report);
        // nobody listening is fine, the report was logged
        let _ = self.inner.reports.send(report);
    }

    /// Register `connection` as the controller, replacing (and closing) any previous one.
    ///
    /// The new controller is told about every peer already connected, and every
    /// session starts over.
    pub async fn connect_controller(&self, connection: Connection) {
        let mut registry = self.inner.registry.write().await;
        info!("controller connected on {}", connection.id());
        registry.register_controller(connection);
        registry.reset_phases();
        for (peer_id, _) in registry.all_peers() {
            self.notify_controller(&registry, SignalingMessage::ClientConnect(peer_id));
        }
    }

    /// Forget the controller if `id` is still the registered one.
    pub async fn disconnect_controller(&self, id: ConnectionId) {
        let mut registry = self.inner.registry.write().await;
        if registry.remove_controller(id).is_some() {
            info!("controller on {} disconnected", id);
            registry.reset_phases();
        } else {
            debug!("superseded controller on {} went away", id);
        }
    }

    /// Register a peer transport and return the identity it was given.
    ///
    /// `requested` reuses an identity; if that identity is live, its transport is
    /// closed and the controller sees it disconnect before the new one connects.
    pub async fn connect_peer(&self, requested: Option<PeerId>, connection: Connection) -> PeerId {
        let peer_id = requested
            .filter(|peer_id| !peer_id.as_str().trim().is_empty())
            .unwrap_or_else(|| PeerId::new(Uuid::new_v4().to_string()));

        let mut registry = self.inner.registry.write().await;
        info!("peer `{}` connected on {}", peer_id, connection.id());
        if registry
            .register_peer(peer_id.clone(), connection)
            .is_some()
        {
            self.notify_controller(&registry, SignalingMessage::ClientDisconnect(peer_id.clone()));
        }
        self.notify_controller(&registry, SignalingMessage::ClientConnect(peer_id.clone()));
        peer_id
    }

    /// Remove `peer_id` if connection `id` still holds it and tell the controller.
    ///
    /// Returns whether an entry was removed; a connection that was taken over removes
    /// nothing.
    pub async fn disconnect_peer(&self, peer_id: &PeerId, id: ConnectionId) -> bool {
        let mut registry = self.inner.registry.write().await;
        if registry.remove_connection(peer_id, id).is_none() {
            debug!("connection {} of `{}` was already superseded", id, peer_id);
            return false;
        }
        info!("peer `{}` disconnected", peer_id);
        self.notify_controller(&registry, SignalingMessage::ClientDisconnect(peer_id.clone()));
        true
    }

    /// Handle a raw frame sent by the controller on connection `id`.
    pub async fn controller_frame(&self, id: ConnectionId, frame: Frame) {
        if !self.is_controller(id).await {
            debug!("dropping frame from superseded controller {}", id);
            return;
        }
        let message = match decode(frame) {
            Ok(message) => message,
            Err(source) => {
                return self.report(RelayError::Decode {
                    peer_id: None,
                    source,
                })
            }
        };

        let mut registry = self.inner.registry.write().await;
        if registry.controller().map(Connection::id) != Some(id) {
            debug!("dropping message from superseded controller {}", id);
            return;
        }
        self.dispatch(&mut registry, &Origin::Controller, message);
    }

    async fn is_controller(&self, id: ConnectionId) -> bool {
        self.inner.registry.read().await.controller().map(Connection::id) == Some(id)
    }

    /// Handle a raw frame sent by `peer_id` on connection `id`.
    pub async fn peer_frame(&self, peer_id: &PeerId, id: ConnectionId, frame: Frame) {
        let message = match decode(frame) {
            Ok(message) => message,
            Err(source) => {
                return self.report(RelayError::Decode {
                    peer_id: Some(peer_id.clone()),
                    source,
                })
            }
        };

        let mut registry = self.inner.registry.write().await;
        if !registry.is_current(peer_id, id) {
            debug!("dropping message from superseded connection {} of `{}`", id, peer_id);
            return;
        }
        self.dispatch(&mut registry, &Origin::Peer(peer_id.clone()), message);
    }

    fn dispatch(&self, registry: &mut Registry, origin: &Origin, message: SignalingMessage) {
        if let Some(source) = router::impersonation(origin, &message) {
            self.report(RelayError::Routing {
                peer_id: origin.peer_id().cloned(),
                source,
            });
        }

        let route = match router::route(origin, message, registry) {
            Ok(route) => route,
            Err(source) => {
                return self.report(RelayError::Routing {
                    peer_id: origin.peer_id().cloned(),
                    source,
                })
            }
        };

        let advance = match (route.session(origin), route.message()) {
            (Some(peer_id), Some(message)) => match registry.session(peer_id) {
                Some(session) => match negotiation::transition(session.phase, message) {
                    Ok(phase) => Some((peer_id.clone(), phase)),
                    Err(rejection) => {
                        return self.report(RelayError::ProtocolViolation {
                            peer_id: peer_id.clone(),
                            rejection,
                        })
                    }
                },
                None => None,
            },
            _ => None,
        };

        let delivered = match route {
            Route::Peer(peer_id, message) => match registry.lookup(&peer_id) {
                Ok(connection) => self.deliver(connection, Some(&peer_id), &message),
                Err(source) => {
                    self.report(RelayError::Routing {
                        peer_id: origin.peer_id().cloned(),
                        source,
                    });
                    false
                }
            },
            Route::Controller(message) => registry
                .controller()
                .map_or(false, |controller| self.deliver(controller, None, &message)),
            Route::Broadcast(message) => {
                for (peer_id, connection) in registry.all_peers() {
                    self.deliver(&connection, Some(&peer_id), &message);
                }
                true
            }
            Route::Log { peer_id, message } => {
                match peer_id {
                    Some(peer_id) => info!("[log from `{}`] {}", peer_id, message),
                    None => info!("[log from controller] {}", message),
                }
                true
            }
        };

        // a session only moves on once the other side actually has the message
        if let (true, Some((peer_id, phase))) = (delivered, advance) {
            if let Some(session) = registry.session_mut(&peer_id) {
                if phase != session.phase {
                    debug!("session `{}`: {} -> {}", peer_id, session.phase, phase);
                }
                session.phase = phase;
            }
        }
    }

    /// Queue `message` on `connection`; failures are reported and yield `false`.
    fn deliver(
        &self,
        connection: &Connection,
        peer_id: Option<&PeerId>,
        message: &SignalingMessage,
    ) -> bool {
        let sent = encode(message)
            .map_err(TransportError::from)
            .and_then(|frame| connection.send(frame));
        match sent {
            Ok(()) => {
                debug!(
                    "delivered {} to {}",
                    message.type_name(),
                    peer_id.map_or("controller", PeerId::as_str)
                );
                true
            }
            Err(source) => {
                self.report(RelayError::Transport {
                    peer_id: peer_id.cloned(),
                    source,
                });
                false
            }
        }
    }

    fn notify_controller(&self, registry: &Registry, notice: SignalingMessage) {
        match registry.controller() {
            Some(controller) => {
                self.deliver(controller, None, &notice);
            }
            None => debug!("no controller to notify about {:?}", notice),
        }
    }

    /// Record that the media layer established the connection with `peer_id`.
    ///
    /// # Errors
    /// [`RoutingError::NotFound`] for an unknown peer, a protocol violation when the
    /// session has not been answered yet.
    pub async fn mark_connected(&self, peer_id: &PeerId) -> Result<Phase, RelayError> {
        let mut registry = self.inner.registry.write().await;
        let Some(session) = registry.session_mut(peer_id) else {
            let not_found = || RelayError::Routing {
                peer_id: Some(peer_id.clone()),
                source: RoutingError::NotFound(peer_id.clone()),
            };
            self.report(not_found());
            return Err(not_found());
        };
        match negotiation::connected(session.phase) {
            Ok(phase) => {
                session.phase = phase;
                Ok(phase)
            }
            Err(rejection) => {
                let violation = || RelayError::ProtocolViolation {
                    peer_id: peer_id.clone(),
                    rejection,
                };
                self.report(violation());
                Err(violation())
            }
        }
    }

    /// Current negotiation phase of the session with `peer_id`.
    pub async fn phase(&self, peer_id: &PeerId) -> Option<Phase> {
        self.inner
            .registry
            .read()
            .await
            .session(peer_id)
            .map(|session| session.phase)
    }

    /// Identities of all registered peers.
    pub async fn peers(&self) -> Vec<PeerId> {
        self.inner
            .registry
            .read()
            .await
            .all_peers()
            .into_iter()
            .map(|(peer_id, _)| peer_id)
            .collect()
    }

    /// Whether a controller is registered.
    pub async fn has_controller(&self) -> bool {
        self.inner.registry.read().await.controller().is_some()
    }

    /// Send a raw frame to one peer, outside of any negotiation.
    ///
    /// # Errors
    /// [`RelayError::Routing`] for an unknown peer, [`RelayError::Transport`] when its
    /// connection is gone.
    pub async fn send_to(&self, peer_id: &PeerId, frame: Frame) -> Result<(), RelayError> {
        let registry = self.inner.registry.read().await;
        let connection = registry
            .lookup(peer_id)
            .map_err(|source| RelayError::Routing {
                peer_id: Some(peer_id.clone()),
                source,
            })?;
        connection.send(frame).map_err(|source| RelayError::Transport {
            peer_id: Some(peer_id.clone()),
            source,
        })
    }

    /// Send a raw frame to every peer; returns how many transports accepted it.
    pub async fn broadcast(&self, frame: Frame) -> usize {
        let peers = self.inner.registry.read().await.all_peers();
        let mut delivered = 0;
        for (peer_id, connection) in peers {
            match connection.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(source) => self.report(RelayError::Transport {
                    peer_id: Some(peer_id),
                    source,
                }),
            }
        }
        delivered
    }

    /// Serve one peer transport until it closes.
    ///
    /// `frames` ends when the remote side goes away; `sink` is written by a separate
    /// task so a slow peer never holds up the relay.
    pub async fn serve_peer<St, Si>(&self, requested: Option<PeerId>, sink: Si, mut frames: St)
    where
        St: Stream<Item = Frame> + Unpin,
        Si: Sink<Frame> + Unpin + Send + 'static,
        Si::Error: Display,
    {
        let (connection, outbound) = Connection::new();
        let id = connection.id();
        tokio::spawn(transport::pump(outbound, sink));

        let peer_id = self.connect_peer(requested, connection).await;
        while let Some(frame) = frames.next().await {
            self.peer_frame(&peer_id, id, frame).await;
        }
        self.disconnect_peer(&peer_id, id).await;
    }

    /// Serve the controller transport until it closes.
    pub async fn serve_controller<St, Si>(&self, sink: Si, mut frames: St)
    where
        St: Stream<Item = Frame> + Unpin,
        Si: Sink<Frame> + Unpin + Send + 'static,
        Si::Error: Display,
    {
        let (connection, outbound) = Connection::new();
        let id = connection.id();
        tokio::spawn(transport::pump(outbound, sink));

        self.connect_controller(connection).await;
        while let Some(frame) = frames.next().await {
            self.controller_frame(id, frame).await;
        }
        self.disconnect_controller(id).await;
    }

    /// Register an in-process controller, for hosts that embed the relay.
    ///
    /// Returns the same handle/stream pair as [`crate::controller::connect`], so one
    /// [`crate::controller::Controller`] drives either topology.
    pub async fn attach_controller(&self) -> (ControllerHandle, FrameStream) {
        let (to_controller, inbound) = Connection::new();
        let id = to_controller.id();
        self.connect_controller(to_controller).await;

        let (handle, mut from_controller) = Connection::new();
        let relay = self.clone();
        tokio::spawn(async move {
            while let Some(frame) = from_controller.next().await {
                relay.controller_frame(id, frame).await;
            }
            relay.disconnect_controller(id).await;
            info!("embedded controller detached");
        });

        (ControllerHandle::new(handle), inbound.into_stream())
    }
}
