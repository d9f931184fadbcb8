//! # Message Dispatch
//!
//! Buffer pooling and batched delivery of pending connection output.
//!
//! ## Components
//! - **MessageDispatchPool**: free list of message buffers, the pending
//!   connection set, and the flush cycle
//! - **FlushScheduler**: tokio task that runs the flush cycle on a fixed interval
//!
//! ## Flush Cycle
//! 1. Drain the pending set under the pool lock (later registrations wait for the next cycle)
//! 2. For each drained connection: take its pending message, finalize framing, write it
//! 3. Return every buffer to the free list; transport failures are reported, never retried

mod pool;
mod scheduler;

pub use pool::{FlushReport, MessageDispatchPool};
pub use scheduler::FlushScheduler;

#[cfg(test)]
mod tests;
