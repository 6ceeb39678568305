// src/dispatch/mod.rs
// =============================================================================
// This module moves requests from clients to workers and replies back.
//
// Submodules:
// - queue: the bounded job queue; each Job carries its own reply channel
// - worker: the fetch → parse → encode → reply loop
// - broker: the TCP front end that turns request lines into Jobs
//
// Data flow:
//   client ─TCP─▶ broker ─Job─▶ queue ─▶ idle worker ─Reply─▶ broker ─TCP─▶ client
// =============================================================================

mod broker;
mod queue;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use broker::Broker;
pub use queue::job_queue;
pub use worker::Worker;

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a queue instead of handing connections straight to workers?
//    - A connection may stay open for many requests, or sit idle
//    - Workers should only ever wait on real work
//    - The queue pairs each request with whichever worker is free
//
// 2. Why does each Job carry a oneshot channel?
//    - The worker does not know (or care) which connection asked
//    - The channel is the return address, and it can be used only once,
//      so a request can never get two replies
// -----------------------------------------------------------------------------
