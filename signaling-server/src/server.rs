use std::future;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use peer_relay::{Frame, PeerId, Relay};

/// Role a WebSocket connection was accepted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Controller,
    Peer { requested: Option<PeerId> },
}

/// Serve one upgraded WebSocket until either side closes it.
pub async fn user_connected(ws: WebSocket, relay: Relay, role: Role) {
    let (ws_tx, ws_rx) = ws.split();
    let sink = ws_tx.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(into_message(frame))));
    let frames = ws_rx
        .take_while(|message| {
            future::ready(match message {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(error) => {
                    warn!("websocket error: {}", error);
                    false
                }
            })
        })
        .filter_map(|message| future::ready(message.ok().and_then(into_frame)));
    futures_util::pin_mut!(frames);

    match role {
        Role::Controller => {
            info!("controller connection accepted");
            relay.serve_controller(sink, frames).await;
        }
        Role::Peer { requested } => relay.serve_peer(requested, sink, frames).await,
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(bytes) => Message::Binary(bytes),
    }
}

fn into_frame(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text)),
        Message::Binary(bytes) => Some(Frame::Binary(bytes)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
    }
}
