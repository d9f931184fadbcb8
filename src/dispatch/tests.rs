// test-only module included via dispatch/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use bytes::Bytes;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::PoolConfig;
use crate::core::checksum::ChecksumMode;
use crate::core::MAX_PAYLOAD_SIZE;
use crate::dispatch::MessageDispatchPool;
use crate::error::DispatchError;
use crate::transport::connection::{Connection, ConnectionHandle};
use crate::transport::{ConnectionId, Transport};

#[derive(Default)]
struct RecordingTransport {
    frames: Mutex<Vec<Bytes>>,
}

impl RecordingTransport {
    fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn write(&self, frame: Bytes) -> io::Result<()> {
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }
}

struct FailingTransport;

impl Transport for FailingTransport {
    fn write(&self, _frame: Bytes) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset"))
    }
}

fn connection(id: u64, mode: ChecksumMode) -> (ConnectionHandle, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let conn = Connection::new(ConnectionId(id), transport.clone(), mode);
    (conn, transport)
}

fn framed(payload: &[u8]) -> Vec<u8> {
    let mut out = (payload.len() as u16).to_le_bytes().to_vec();
    out.extend_from_slice(payload);
    out
}

#[test]
fn test_acquire_reuses_released_buffers() {
    let pool = MessageDispatchPool::default();

    let batch: Vec<_> = (0..8).map(|_| pool.acquire_message()).collect();
    assert_eq!(pool.allocated(), 8);
    for message in batch {
        pool.release_message(message);
    }
    assert_eq!(pool.available(), 8);

    let again: Vec<_> = (0..8).map(|_| pool.acquire_message()).collect();
    assert_eq!(pool.allocated(), 8);
    assert_eq!(pool.metrics().snapshot().buffers_recycled, 8);
    drop(again);
}

#[test]
fn test_released_buffer_is_reset() {
    let pool = MessageDispatchPool::default();
    let mut message = pool.acquire_message();
    message.write(b"stale").unwrap();
    message.finalize_framing(true, 7).unwrap();
    pool.release_message(message);

    let message = pool.acquire_message();
    assert!(message.is_empty());
    assert!(!message.is_framed());
    assert!(message.output_buffer().is_empty());
}

#[test]
fn test_free_list_capacity_is_soft_cap() {
    let pool = MessageDispatchPool::new(PoolConfig {
        free_list_capacity: 2,
        preallocate: 0,
    });

    let batch: Vec<_> = (0..4).map(|_| pool.acquire_message()).collect();
    for message in batch {
        pool.release_message(message);
    }

    assert_eq!(pool.available(), 2);
    assert_eq!(pool.metrics().snapshot().buffers_dropped, 2);
}

#[test]
fn test_preallocate_fills_free_list() {
    let pool = MessageDispatchPool::new(PoolConfig {
        free_list_capacity: 16,
        preallocate: 4,
    });
    assert_eq!(pool.available(), 4);

    let _m = pool.acquire_message();
    assert_eq!(pool.allocated(), 4);
}

#[test]
fn test_register_is_idempotent() {
    let pool = MessageDispatchPool::default();
    let (conn, _) = connection(1, ChecksumMode::Disabled);

    assert!(pool.register_for_auto_flush(&conn));
    assert!(!pool.register_for_auto_flush(&conn));
    assert_eq!(pool.pending_count(), 1);

    assert!(pool.unregister_from_auto_flush(&conn));
    assert!(!pool.is_registered(&conn));
    assert!(!pool.unregister_from_auto_flush(&conn));
}

#[test]
fn test_write_payload_registers_once() {
    let pool = MessageDispatchPool::default();
    let (conn, _) = connection(1, ChecksumMode::Disabled);

    conn.write_payload(&pool, b"a").unwrap();
    conn.write_payload(&pool, b"b").unwrap();

    assert!(pool.is_registered(&conn));
    assert_eq!(pool.pending_count(), 1);
    assert_eq!(pool.allocated(), 1);
}

#[test]
fn test_flush_all_delivers_each_connection_its_own_bytes() {
    let pool = MessageDispatchPool::default();
    let peers: Vec<_> = (1..=3)
        .map(|id| connection(id, ChecksumMode::Disabled))
        .collect();

    for (conn, _) in &peers {
        let payload = vec![conn.id().0 as u8; 10 * conn.id().0 as usize];
        conn.write_payload(&pool, &payload).unwrap();
    }

    let report = pool.flush_all();
    assert!(report.is_clean());
    assert_eq!(report.visited, 3);
    assert_eq!(report.flushed, 3);

    for (conn, transport) in &peers {
        let expected = framed(&vec![conn.id().0 as u8; 10 * conn.id().0 as usize]);
        let frames = transport.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &expected[..]);
        assert!(!conn.has_pending());
    }

    assert_eq!(pool.pending_count(), 0);
    assert_eq!(pool.available(), 3);
}

#[test]
fn test_flush_applies_connection_checksum() {
    let pool = MessageDispatchPool::default();
    let (conn, transport) = connection(9, ChecksumMode::Crc32);
    conn.write_payload(&pool, b"123456789").unwrap();

    pool.flush_all();

    let frame = &transport.frames()[0];
    assert_eq!(&frame[0..4], &0xCBF4_3926u32.to_le_bytes());
    assert_eq!(&frame[4..6], &13u16.to_le_bytes());
    assert_eq!(&frame[6..], b"123456789");
}

#[test]
fn test_unregistered_connection_gets_no_write() {
    let pool = MessageDispatchPool::default();
    let (kept, kept_transport) = connection(1, ChecksumMode::Disabled);
    let (cancelled, cancelled_transport) = connection(2, ChecksumMode::Disabled);

    kept.write_payload(&pool, b"keep").unwrap();
    cancelled.write_payload(&pool, b"drop").unwrap();
    pool.unregister_from_auto_flush(&cancelled);

    assert!(!cancelled.has_pending());
    let report = pool.flush_all();

    assert_eq!(report.flushed, 1);
    assert_eq!(kept_transport.frames().len(), 1);
    assert!(cancelled_transport.frames().is_empty());
    assert_eq!(pool.metrics().snapshot().cancellations, 1);
}

#[test]
fn test_cancelled_during_cycle_is_skipped() {
    let pool = MessageDispatchPool::default();
    let (conn, transport) = connection(1, ChecksumMode::Disabled);
    conn.write_payload(&pool, b"x").unwrap();

    // Pending set still lists the connection but the message is gone
    let message = conn.take_pending().unwrap();
    pool.release_message(message);

    let report = pool.flush_all();
    assert_eq!(report.visited, 1);
    assert_eq!(report.skipped, 1);
    assert!(transport.frames().is_empty());
}

#[test]
fn test_transport_failure_does_not_abort_cycle() {
    let pool = MessageDispatchPool::default();
    let broken = Connection::new(
        ConnectionId(1),
        Arc::new(FailingTransport),
        ChecksumMode::Disabled,
    );
    let (healthy, transport) = connection(2, ChecksumMode::Disabled);

    broken.write_payload(&pool, b"lost").unwrap();
    healthy.write_payload(&pool, b"fine").unwrap();

    let report = pool.flush_all();
    assert_eq!(report.flushed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, ConnectionId(1));
    assert!(matches!(report.failures[0].1, DispatchError::Io(_)));

    assert!(broken.write_failed());
    assert!(!broken.has_pending());
    assert_eq!(transport.frames().len(), 1);
    // Failed buffer is recycled as if flushed
    assert_eq!(pool.available(), 2);
}

#[test]
fn test_framing_error_discards_message_and_cycle_continues() {
    let pool = MessageDispatchPool::default();
    let (crowded, crowded_transport) = connection(1, ChecksumMode::Crc32);
    let (healthy, healthy_transport) = connection(2, ChecksumMode::Disabled);

    // 4 of 8 reserved bytes used, checksum plus length needs 6
    let mut message = pool.acquire_message();
    message.write(b"body").unwrap();
    message.prepend_header_field(0u32).unwrap();
    crowded.enqueue(&pool, message).unwrap();
    healthy.write_payload(&pool, b"fine").unwrap();

    let report = pool.flush_all();
    assert_eq!(report.visited, 2);
    assert_eq!(report.flushed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, ConnectionId(1));
    assert!(matches!(
        report.failures[0].1,
        DispatchError::HeaderSpaceExhausted {
            needed: 6,
            available: 4
        }
    ));

    assert!(crowded_transport.frames().is_empty());
    assert!(!crowded.has_pending());
    assert!(!crowded.write_failed());
    assert_eq!(&healthy_transport.frames()[0][..], &framed(b"fine")[..]);

    // Only the healthy buffer is recycled
    assert_eq!(pool.allocated(), 2);
    assert_eq!(pool.available(), 1);
    assert_eq!(pool.metrics().snapshot().framing_errors, 1);
}

#[test]
fn test_failed_early_send_is_reported_on_connection() {
    let pool = MessageDispatchPool::default();
    let conn = Connection::new(
        ConnectionId(1),
        Arc::new(FailingTransport),
        ChecksumMode::Disabled,
    );

    conn.write_payload(&pool, &vec![0u8; MAX_PAYLOAD_SIZE]).unwrap();
    assert!(!conn.write_failed());

    // Forces the full message out early; the write itself still succeeds
    conn.write_payload(&pool, b"next").unwrap();
    assert!(conn.write_failed());
    assert!(conn.has_pending());
    assert_eq!(pool.metrics().snapshot().write_errors, 1);
}

#[test]
fn test_registration_after_drain_waits_for_next_cycle() {
    let pool = MessageDispatchPool::default();
    let (conn, transport) = connection(1, ChecksumMode::Disabled);

    conn.write_payload(&pool, b"one").unwrap();
    pool.flush_all();
    conn.write_payload(&pool, b"two").unwrap();
    assert!(pool.is_registered(&conn));

    pool.flush_all();
    let frames = transport.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(&frames[1][..], &framed(b"two")[..]);
}

#[test]
fn test_full_pending_message_is_sent_early_in_order() {
    let pool = MessageDispatchPool::default();
    let (conn, transport) = connection(1, ChecksumMode::Disabled);

    let big = vec![0xAB; MAX_PAYLOAD_SIZE - 10];
    conn.write_payload(&pool, &big).unwrap();
    conn.write_payload(&pool, &[0xCD; 20]).unwrap();

    // First message went out immediately, second waits for the cycle
    assert_eq!(transport.frames().len(), 1);
    pool.flush_all();

    let frames = transport.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(&frames[0][..], &framed(&big)[..]);
    assert_eq!(&frames[1][..], &framed(&[0xCD; 20])[..]);
}

#[test]
fn test_oversized_write_payload_rejected() {
    let pool = MessageDispatchPool::default();
    let (conn, _) = connection(1, ChecksumMode::Disabled);

    let err = conn
        .write_payload(&pool, &vec![0u8; MAX_PAYLOAD_SIZE + 1])
        .unwrap_err();
    assert!(matches!(err, DispatchError::BufferOverflow { .. }));
    assert!(!conn.has_pending());
    assert!(!pool.is_registered(&conn));
}

#[test]
fn test_enqueue_merges_unframed_messages() {
    let pool = MessageDispatchPool::default();
    let (conn, transport) = connection(1, ChecksumMode::Disabled);

    let mut first = pool.acquire_message();
    first.write(b"ab").unwrap();
    let mut second = pool.acquire_message();
    second.write(b"cd").unwrap();

    conn.enqueue(&pool, first).unwrap();
    conn.enqueue(&pool, second).unwrap();
    // The merged-from buffer is back on the free list
    assert_eq!(pool.available(), 1);
    assert_eq!(pool.metrics().snapshot().buffers_released, 1);

    pool.flush_all();
    assert_eq!(&transport.frames()[0][..], &framed(b"abcd")[..]);
}

#[test]
fn test_enqueue_framed_message_sends_after_pending() {
    let pool = MessageDispatchPool::default();
    let (conn, transport) = connection(1, ChecksumMode::Disabled);

    conn.write_payload(&pool, b"first").unwrap();
    let mut ready = pool.acquire_message();
    ready.write(b"second").unwrap();
    ready.finalize_framing(true, 0x0102_0304).unwrap();
    conn.enqueue(&pool, ready).unwrap();

    let frames = transport.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(&frames[0][..], &framed(b"first")[..]);
    assert_eq!(&frames[1][..4], &0x0102_0304u32.to_le_bytes());
    assert!(!conn.has_pending());
}

#[test]
fn test_flush_connection_immediately() {
    let pool = MessageDispatchPool::default();
    let (conn, transport) = connection(1, ChecksumMode::Disabled);
    conn.write_payload(&pool, b"now").unwrap();

    let report = pool.flush_connection(&conn);
    assert_eq!(report.flushed, 1);
    assert!(!pool.is_registered(&conn));
    assert_eq!(&transport.frames()[0][..], &framed(b"now")[..]);
}

#[test]
fn test_schedule_outside_runtime_fails() {
    let pool = Arc::new(MessageDispatchPool::default());
    let err = pool
        .schedule_flush_cycle(Duration::from_millis(10))
        .unwrap_err();
    assert!(matches!(err, DispatchError::RuntimeUnavailable));
    assert!(!pool.is_scheduled());
}

#[tokio::test]
async fn test_schedule_twice_rejected() {
    let pool = Arc::new(MessageDispatchPool::default());
    let scheduler = pool.schedule_flush_cycle(Duration::from_millis(10)).unwrap();

    assert!(matches!(
        pool.schedule_flush_cycle(Duration::from_millis(10)),
        Err(DispatchError::SchedulerActive)
    ));

    scheduler.shutdown().await;
    assert!(!pool.is_scheduled());
    let again = pool.schedule_flush_cycle(Duration::from_millis(10)).unwrap();
    again.shutdown().await;
}
