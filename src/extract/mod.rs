// src/extract/mod.rs
// =============================================================================
// This module turns page bytes into the reply a client receives.
//
// Submodules:
// - html: parses the page and collects href values from <a> elements
// - reply: the Reply type and its JSON / sentinel wire forms
// =============================================================================

mod html;
mod reply;

pub use html::links_in_page;
pub use reply::{encode, Reply, DONE_SENTINEL, ERROR_SENTINEL};
