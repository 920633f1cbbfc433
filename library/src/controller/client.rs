use futures_util::{future, SinkExt, StreamExt};
use log::{debug, info, warn};
use peer_relay_protocol::Frame;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::controller::ControllerHandle;
use crate::error::TransportError;
use crate::transport::{self, Connection, FrameStream};

/// Dial the relay at `url` as its controller, announcing `subprotocol`.
///
/// Fails right away when the relay cannot be reached, so a controller can refuse to
/// start without one.
///
/// # Errors
/// [`TransportError::WebSocket`] when the connection or handshake fails,
/// [`TransportError::InvalidSubprotocol`] when `subprotocol` is not a valid header value.
pub async fn connect(
    url: &str,
    subprotocol: &str,
) -> Result<(ControllerHandle, FrameStream), TransportError> {
    let mut request = url.into_client_request()?;
    let protocol = HeaderValue::from_str(subprotocol)
        .map_err(|_| TransportError::InvalidSubprotocol(subprotocol.to_owned()))?;
    request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocol);

    let (websocket, response) = tokio_tungstenite::connect_async(request).await?;
    info!("connected to relay at {} as controller", url);
    debug!("handshake response: {:?}", response.status());

    let (ws_tx, ws_rx) = websocket.split();
    let (connection, outbound) = Connection::new();
    let sink = ws_tx.with(|frame: Frame| future::ready(Ok::<_, WsError>(into_message(frame))));
    tokio::spawn(transport::pump(outbound, sink));

    let frames = ws_rx
        .take_while(|message| {
            future::ready(match message {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(error) => {
                    warn!("relay connection error: {}", error);
                    false
                }
            })
        })
        .filter_map(|message| future::ready(message.ok().and_then(into_frame)));

    Ok((ControllerHandle::new(connection), Box::pin(frames)))
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
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
