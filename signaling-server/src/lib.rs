/*!
WebSocket front end for the [`peer_relay`] signaling relay.

Every connection is accepted on a single path. A connection that offers the controller
subprotocol (`sender` by default) becomes the controller; any other connection is a peer.
A peer can reclaim a previous identity with the `clientId` query parameter, otherwise it
is given a fresh one.
 */

pub mod config;
pub mod router;
pub mod server;
