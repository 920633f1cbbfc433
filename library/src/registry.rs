use std::collections::HashMap;

use log::info;
use peer_relay_protocol::PeerId;

use crate::error::RoutingError;
use crate::negotiation::Phase;
use crate::transport::{Connection, ConnectionId};

/// Negotiation state the relay keeps for one controller-peer pair.
#[derive(Debug, Clone)]
pub struct Session {
    pub connection: Connection,
    pub phase: Phase,
}

impl Session {
    fn new(connection: Connection) -> Self {
        Self {
            connection,
            phase: Phase::Idle,
        }
    }
}

/// Live transports by identity, plus the single controller transport.
///
/// Plain data: the relay owns one behind its lock and turns registrations and
/// removals into `ClientConnect`/`ClientDisconnect` notices for the controller.
#[derive(Debug, Default)]
pub struct Registry {
    controller: Option<Connection>,
    peers: HashMap<PeerId, Session>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the controller transport, closing and returning the one it replaces.
    pub fn register_controller(&mut self, connection: Connection) -> Option<Connection> {
        let previous = self.controller.replace(connection);
        if let Some(previous) = &previous {
            info!("controller {} replaced, closing it", previous.id());
            previous.close();
        }
        previous
    }

    #[must_use]
    pub const fn controller(&self) -> Option<&Connection> {
        self.controller.as_ref()
    }

    /// Drop the controller if `id` is still the registered one.
    pub fn remove_controller(&mut self, id: ConnectionId) -> Option<Connection> {
        match &self.controller {
            Some(controller) if controller.id() == id => self.controller.take(),
            _ => None,
        }
    }

    /// Map `peer_id` to `connection` in a fresh session.
    ///
    /// A live transport already holding the identity is closed, evicted and returned.
    pub fn register_peer(&mut self, peer_id: PeerId, connection: Connection) -> Option<Connection> {
        let stale = self
            .peers
            .insert(peer_id.clone(), Session::new(connection))
            .map(|session| session.connection);
        if let Some(stale) = &stale {
            info!("peer `{}` took over from stale connection {}", peer_id, stale.id());
            stale.close();
        }
        stale
    }

    /// Transport currently registered for `peer_id`.
    ///
    /// # Errors
    /// [`RoutingError::NotFound`] for an unknown identity.
    pub fn lookup(&self, peer_id: &PeerId) -> Result<&Connection, RoutingError> {
        self.peers
            .get(peer_id)
            .map(|session| &session.connection)
            .ok_or_else(|| RoutingError::NotFound(peer_id.clone()))
    }

    #[must_use]
    pub fn session(&self, peer_id: &PeerId) -> Option<&Session> {
        self.peers.get(peer_id)
    }

    pub fn session_mut(&mut self, peer_id: &PeerId) -> Option<&mut Session> {
        self.peers.get_mut(peer_id)
    }

    /// Forget `peer_id`. Unknown identities are ignored.
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<Session> {
        self.peers.remove(peer_id)
    }

    /// Forget `peer_id` only while it is still served by connection `id`.
    ///
    /// A connection that lost its identity to a takeover must not evict its successor.
    pub fn remove_connection(&mut self, peer_id: &PeerId, id: ConnectionId) -> Option<Session> {
        match self.peers.get(peer_id) {
            Some(session) if session.connection.id() == id => self.peers.remove(peer_id),
            _ => None,
        }
    }

    /// Whether `peer_id` is currently served by connection `id`.
    #[must_use]
    pub fn is_current(&self, peer_id: &PeerId, id: ConnectionId) -> bool {
        self.peers
            .get(peer_id)
            .map_or(false, |session| session.connection.id() == id)
    }

    /// Snapshot of every registered peer and its transport.
    #[must_use]
    pub fn all_peers(&self) -> Vec<(PeerId, Connection)> {
        self.peers
            .iter()
            .map(|(peer_id, session)| (peer_id.clone(), session.connection.clone()))
            .collect()
    }

    /// Start every session over, as happens when the controller changes.
    pub fn reset_phases(&mut self) {
        for session in self.peers.values_mut() {
            session.phase = Phase::Idle;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
