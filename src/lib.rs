//! # Message Dispatch
//!
//! Outbound message framing, buffer pooling and batched flush scheduling for
//! multiplayer game servers.
//!
//! Session logic builds payloads into pooled [`OutgoingMessage`] buffers, parks
//! them on a [`Connection`], and a [`MessageDispatchPool`] periodically frames
//! and writes every pending connection in one flush cycle.
//!
//! ## Wire Format
//! ```text
//! [Checksum(4, optional)] [Length(2)] [Payload(N)]
//! ```
//! All header fields are little-endian. `Length` counts the checksum (when
//! present) and the payload, never itself.
//!
//! ## Example
//! ```rust,no_run
//! use message_dispatch::config::DispatchConfig;
//! use message_dispatch::core::checksum::ChecksumMode;
//! use message_dispatch::dispatch::MessageDispatchPool;
//! use message_dispatch::transport::{channel::ChannelTransport, connection::Connection, ConnectionId};
//! use std::sync::Arc;
//!
//! # async fn run() -> message_dispatch::error::Result<()> {
//! let config = DispatchConfig::default();
//! let pool = Arc::new(MessageDispatchPool::with_config(&config));
//! let scheduler = pool.schedule_flush_cycle(config.scheduler.flush_interval)?;
//!
//! let (transport, _frames) = ChannelTransport::new();
//! let conn = Connection::new(ConnectionId(1), Arc::new(transport), ChecksumMode::Crc32);
//! conn.write_payload(&pool, b"hello")?;
//!
//! scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod transport;
pub mod utils;

pub use crate::core::buffer::RawMessageBuffer;
pub use crate::core::message::OutgoingMessage;
pub use crate::dispatch::{FlushReport, FlushScheduler, MessageDispatchPool};
pub use crate::error::{DispatchError, Result};
pub use crate::transport::connection::{Connection, ConnectionHandle};
pub use crate::transport::{ConnectionId, Transport};
