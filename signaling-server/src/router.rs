use std::collections::HashMap;

use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::header::SEC_WEBSOCKET_PROTOCOL;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use log::debug;
use peer_relay::{PeerId, Relay, CLIENT_ID_PARAM};

use crate::server::{user_connected, Role};

#[derive(Clone)]
pub struct ServerState {
    relay: Relay,
}

impl ServerState {
    #[must_use]
    pub const fn new(relay: Relay) -> Self {
        Self { relay }
    }
}

#[allow(clippy::unused_async)]
async fn health_handler() -> &'static str {
    "OK"
}

#[allow(clippy::unused_async)]
async fn relay_handler(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let controller_protocol = state.relay.config().controller_protocol.clone();
    let role = if offers_protocol(&headers, &controller_protocol) {
        Role::Controller
    } else {
        Role::Peer {
            requested: params.get(CLIENT_ID_PARAM).map(|id| PeerId::from(id.as_str())),
        }
    };
    debug!("upgrading connection as {:?}", role);

    let relay = state.relay;
    ws.protocols([controller_protocol])
        .on_upgrade(move |socket| user_connected(socket, relay, role))
}

/// Whether the handshake lists `protocol` among its requested subprotocols.
fn offers_protocol(headers: &HeaderMap, protocol: &str) -> bool {
    headers
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|offered| offered.trim() == protocol)
}

pub fn create(server_state: ServerState, path: &str) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(path, get(relay_handler))
        .with_state(server_state)
}
