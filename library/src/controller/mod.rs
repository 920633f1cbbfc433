/*!
The controller side of the relay: the single endpoint that starts a session with every
peer that shows up.

A controller either dials a relay over WebSocket with [`connect`], or is embedded in
the process hosting the relay through [`Relay::attach_controller`](crate::Relay::attach_controller).
Both hand back a [`ControllerHandle`] for sending and a stream of inbound frames,
which a [`Controller`] turns into calls on a [`MediaHandler`].
 */

mod callbacks;
mod client;
mod websocket_handler;

use futures_util::StreamExt;
use log::{debug, info};
use peer_relay_protocol::{
    decode, encode, Description, Frame, IceCandidate, PeerId, SignalingMessage,
};

pub use crate::controller::callbacks::MediaHandler;
pub use crate::controller::client::connect;
use crate::controller::websocket_handler::handle_signaling_message;
use crate::error::TransportError;
use crate::transport::{Connection, FrameStream};

/// Sending side of a controller; clone it into whatever produces offers and candidates.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    connection: Connection,
}

impl ControllerHandle {
    pub(crate) const fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Send a locally generated offer to `peer_id`.
    ///
    /// # Errors
    /// Blank `sdp`, or the transport to the relay is gone.
    pub fn send_offer(&self, peer_id: &PeerId, sdp: impl Into<String>) -> crate::Result<()> {
        self.send_description(Description::offer(sdp)?.with_peer_id(peer_id.clone()))
    }

    /// Send an offer or answer; it must name its target peer.
    ///
    /// # Errors
    /// The transport to the relay is gone.
    pub fn send_description(&self, description: Description) -> crate::Result<()> {
        self.send_message(&description.into())
    }

    /// Send a local ICE candidate gathered for the session with `peer_id`.
    ///
    /// # Errors
    /// Blank `sdp_mid`, negative `sdp_m_line_index`, or the transport is gone.
    pub fn send_candidate(
        &self,
        peer_id: &PeerId,
        candidate: &str,
        sdp_mid: &str,
        sdp_m_line_index: i64,
    ) -> crate::Result<()> {
        let candidate =
            IceCandidate::new(candidate, sdp_mid, sdp_m_line_index)?.with_peer_id(peer_id.clone());
        self.send_message(&candidate.into())
    }

    /// Send free-form text. The relay broadcasts it to every peer unless it is a JSON
    /// object carrying a `clientId`.
    ///
    /// # Errors
    /// The transport to the relay is gone.
    pub fn send_text(&self, payload: impl Into<String>) -> crate::Result<()> {
        Ok(self.connection.send(Frame::Text(payload.into()))?)
    }

    /// Send binary data to every peer.
    ///
    /// # Errors
    /// The transport to the relay is gone.
    pub fn send_binary(&self, payload: Vec<u8>) -> crate::Result<()> {
        Ok(self.connection.send(Frame::Binary(payload))?)
    }

    /// Close the controller transport once queued frames are out.
    pub fn close(&self) {
        self.connection.close();
    }

    fn send_message(&self, message: &SignalingMessage) -> crate::Result<()> {
        let frame = encode(message).map_err(TransportError::from)?;
        Ok(self.connection.send(frame)?)
    }
}

/// Drives a [`MediaHandler`] from the frames a relay sends to the controller.
pub struct Controller<H> {
    handler: H,
    handle: ControllerHandle,
    frames: FrameStream,
}

impl<H: MediaHandler> Controller<H> {
    #[must_use]
    pub fn new(handle: ControllerHandle, frames: FrameStream, handler: H) -> Self {
        Self {
            handler,
            handle,
            frames,
        }
    }

    #[must_use]
    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    /// Process frames until the relay connection ends, then give the handler back.
    pub async fn run(mut self) -> H {
        while let Some(frame) = self.frames.next().await {
            match decode(frame) {
                Ok(message) => {
                    debug!("controller received {}", message.type_name());
                    handle_signaling_message(&mut self.handler, &self.handle, message);
                }
                Err(error) => self
                    .handler
                    .on_error(None, &anyhow::Error::from(error).context("undecodable frame")),
            }
        }
        info!("relay connection closed");
        self.handler
    }
}
