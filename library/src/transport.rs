/*!
Channel plumbing shared by every transport adapter.

Each live connection is represented by a [`Connection`]: a cheap, cloneable handle
that queues frames for a dedicated writer task. Queuing never blocks, so the relay can
enqueue while holding its registry lock and the actual network write happens later,
in connection order, on the writer task.
 */

use std::fmt::Display;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{stream, Sink, SinkExt, Stream};
use log::{debug, warn};
use peer_relay_protocol::Frame;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Frames arriving from the other side of a connection.
pub type FrameStream = Pin<Box<dyn Stream<Item = Frame> + Send>>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique number of one transport connection.
///
/// Distinguishes a stale connection from the one that took over its identity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
enum Outbound {
    Frame(Frame),
    Close,
}

/// Sending half of one transport connection.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Connection {
    /// Create a connection handle together with the queue its writer drains.
    #[must_use]
    pub fn new() -> (Self, OutboundFrames) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnectionId::next(),
                tx,
            },
            OutboundFrames { rx },
        )
    }

    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame for delivery.
    ///
    /// # Errors
    /// [`TransportError::Closed`] once the writer side is gone. Nothing is retried.
    pub fn send(&self, frame: Frame) -> Result<(), TransportError> {
        self.tx
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::Closed)
    }

    /// Ask the writer to close the connection after the frames already queued.
    pub fn close(&self) {
        // already gone is as good as closed
        let _ = self.tx.send(Outbound::Close);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Frames queued on a [`Connection`], ending when it is closed or every handle is dropped.
#[derive(Debug)]
pub struct OutboundFrames {
    rx: mpsc::UnboundedReceiver<Outbound>,
}

impl OutboundFrames {
    /// Next frame to write, `None` once the connection was closed.
    pub async fn next(&mut self) -> Option<Frame> {
        match self.rx.recv().await {
            Some(Outbound::Frame(frame)) => Some(frame),
            Some(Outbound::Close) | None => {
                self.rx.close();
                None
            }
        }
    }

    /// View the queue as a stream, for in-process consumers.
    #[must_use]
    pub fn into_stream(self) -> FrameStream {
        Box::pin(stream::unfold(self, |mut frames| async move {
            frames.next().await.map(|frame| (frame, frames))
        }))
    }
}

/// Write queued frames into `sink` until the connection is closed or the sink fails.
pub async fn pump<S>(mut frames: OutboundFrames, mut sink: S)
where
    S: Sink<Frame> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = frames.next().await {
        if let Err(error) = sink.send(frame).await {
            warn!("transport send error: {}", error);
            break;
        }
    }
    // dropping the queue makes further sends fail right away
    drop(frames);
    if let Err(error) = sink.close().await {
        debug!("transport close error: {}", error);
    }
}
