//! # Channel Transport
//!
//! A [`Transport`] that pushes frames into an unbounded tokio channel, plus a
//! writer task that drains the channel into any `AsyncWrite`.
//!
//! This keeps the flush cycle non-blocking: the socket write happens on the
//! connection's own writer task, never on the scheduler.
//!
//! ## Usage
//! ```rust,no_run
//! use message_dispatch::transport::channel::{spawn_writer, ChannelTransport};
//!
//! # async fn run(stream: tokio::net::TcpStream) {
//! let (transport, frames) = ChannelTransport::new();
//! let writer = spawn_writer(stream, frames);
//! // hand `transport` to a Connection ...
//! drop(transport);
//! let _ = writer.await;
//! # }
//! ```

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::io;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::codec::{BytesCodec, FramedWrite};
use tracing::debug;

use crate::error::constants::ERR_TRANSPORT_CLOSED;
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChannelTransport {
    /// Create a transport and the receiving end of its frame channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Transport for ChannelTransport {
    fn write(&self, frame: Bytes) -> io::Result<()> {
        self.tx
            .send(frame)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, ERR_TRANSPORT_CLOSED))
    }
}

/// Drain `frames` into `writer` until every sender is dropped.
///
/// Frames are already wire-encoded, so they pass through `BytesCodec` untouched.
pub fn spawn_writer<W>(
    writer: W,
    frames: mpsc::UnboundedReceiver<Bytes>,
) -> JoinHandle<io::Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut sink = FramedWrite::new(writer, BytesCodec::new());
        let mut stream = UnboundedReceiverStream::new(frames).map(Ok::<Bytes, io::Error>);

        sink.send_all(&mut stream).await?;
        SinkExt::<Bytes>::close(&mut sink).await?;
        debug!("Frame channel closed, writer finished");
        Ok(())
    })
}
