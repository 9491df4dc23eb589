//! Live alert channel transport.
//!
//! [`Connector`] is the seam between the reconnecting connection logic in
//! `geowatch-core` and the actual socket. [`TungsteniteConnector`] opens a
//! real WebSocket; tests substitute scripted connectors that hand back
//! in-memory [`Channel`]s.
//!
//! A connector only knows how to open one channel. Reconnection, retry
//! delays and decoding all live above it.
//!
//! # Example
//!
//! ```rust,ignore
//! use geowatch_api::websocket::{Connector, Frame, TungsteniteConnector};
//! use url::Url;
//!
//! let url = Url::parse("ws://localhost:8080/ws/alerts")?;
//! let mut channel = TungsteniteConnector::default().connect(&url).await?;
//!
//! while let Some(Ok(Frame::Text(text))) = channel.next_frame().await {
//!     println!("{text}");
//! }
//! ```

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::Error;

// ── Frames ───────────────────────────────────────────────────────────

/// Close frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

/// Application-level frame. Ping/pong are handled by the transport and
/// never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close(Option<CloseInfo>),
}

// ── Channel ──────────────────────────────────────────────────────────

type Closer = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// One open push channel: an inbound frame stream plus an optional
/// graceful-close hook.
pub struct Channel {
    frames: BoxStream<'static, Result<Frame, Error>>,
    closer: Option<Closer>,
}

impl Channel {
    pub fn new(frames: impl Stream<Item = Result<Frame, Error>> + Send + 'static) -> Self {
        Self {
            frames: frames.boxed(),
            closer: None,
        }
    }

    /// Attach the action run by [`close`](Self::close).
    pub fn with_closer<F>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        self.closer = Some(Box::new(closer));
        self
    }

    /// Next inbound frame. `None` means the peer went away.
    pub async fn next_frame(&mut self) -> Option<Result<Frame, Error>> {
        self.frames.next().await
    }

    /// Close the channel, sending a close frame where the transport
    /// supports one.
    pub async fn close(mut self) {
        if let Some(closer) = self.closer.take() {
            closer().await;
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("closable", &self.closer.is_some())
            .finish_non_exhaustive()
    }
}

// ── Connector ────────────────────────────────────────────────────────

/// Opens push channels to an endpoint.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Channel, Error>>;
}

/// Real WebSocket connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn connect<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Channel, Error>> {
        Box::pin(async move {
            tracing::info!(url = %url, "connecting to alert channel");

            let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

            tracing::info!("alert channel connected");

            // The client never writes; the sink half is only kept to send
            // a close frame on shutdown.
            let (sink, stream) = ws_stream.split();
            let frames = stream.filter_map(|msg| async move { convert_message(msg) });

            Ok(Channel::new(frames).with_closer(move || {
                Box::pin(async move {
                    let mut sink = sink;
                    if let Err(e) = sink.close().await {
                        tracing::debug!(error = %e, "close frame not delivered");
                    }
                })
            }))
        })
    }
}

fn convert_message(
    msg: Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<Result<Frame, Error>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
        Ok(Message::Binary(bytes)) => Some(Ok(Frame::Binary(bytes.to_vec()))),
        Ok(Message::Close(frame)) => Some(Ok(Frame::Close(frame.map(|cf| CloseInfo {
            code: cf.code.into(),
            reason: cf.reason.as_str().to_owned(),
        })))),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
            // tungstenite answers pings itself
            tracing::trace!("control frame");
            None
        }
        Err(e) => Some(Err(Error::WebSocketStream(e.to_string()))),
    }
}

// ── Tests ────────────────────────────────────────────────────────────
