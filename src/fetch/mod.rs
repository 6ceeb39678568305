// src/fetch/mod.rs
// =============================================================================
// This module gets page bytes off the network.
//
// Submodules:
// - buffer: FetchBuffer, the capped growable byte store bodies stream into
// - http: the Fetcher trait and its reqwest-backed implementation
// =============================================================================

mod buffer;
mod http;

pub use buffer::FetchBuffer;
pub use http::{FetchError, Fetcher, HttpFetcher};
