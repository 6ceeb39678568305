// src/extract/reply.rs
// =============================================================================
// The one message a worker sends back for each request.
//
// Wire forms:
//   {"links":["http://x.com","/rel"]}   success (the array may be empty)
//   ERROR                               the page could not be fetched
//   DONE                                the worker is shutting down
// =============================================================================

use serde::Serialize;

pub const ERROR_SENTINEL: &str = "ERROR";
pub const DONE_SENTINEL: &str = "DONE";

/// Outcome of one request, as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Links(Vec<String>),
    Error,
    Done,
}

// Borrowing view used only for serialization, so encoding never copies the
// link strings again
#[derive(Serialize)]
struct LinksDocument<'a> {
    links: &'a [String],
}

impl Reply {
    /// Renders the reply as the text sent over the wire.
    pub fn to_wire(&self) -> String {
        match self {
            Reply::Links(links) => encode_links(links),
            Reply::Error => ERROR_SENTINEL.to_string(),
            Reply::Done => DONE_SENTINEL.to_string(),
        }
    }
}

/// Wraps an extracted link list as a success reply.
pub fn encode(links: Vec<String>) -> Reply {
    Reply::Links(links)
}

fn encode_links(links: &[String]) -> String {
    // Serializing a struct of strings cannot fail
    serde_json::to_string(&LinksDocument { links }).expect("a list of strings always serializes")
}
