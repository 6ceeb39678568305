// src/fetch/buffer.rs
// =============================================================================
// The growable byte store a fetch streams into.
//
// Every response body arrives in chunks. Each chunk is appended to a
// FetchBuffer, which owns a Vec<u8> and enforces the configured size cap.
//
// Memory policy:
// - Growth goes through Vec::try_reserve, so an allocation failure is
//   reported to us instead of aborting inside the allocator
// - Running out of memory is fatal for the whole process (see `exhausted`)
// - Going over the size cap is an ordinary per-request error
//
// Text decoding, first match wins:
// 1. a byte order mark at the start of the body
// 2. the charset of the response's Content-Type header
// 3. a <meta charset> (or http-equiv) declaration near the top of the page
// 4. UTF-8
// Bytes that do not fit the chosen encoding become U+FFFD.
//
// Rust concepts:
// - Ownership: the buffer belongs to exactly one request and is dropped
//   when that request finishes
// - Cow<str>: borrow the bytes as text when they are valid UTF-8, copy
//   only when they are not
// =============================================================================

use std::borrow::Cow;
use std::collections::TryReserveError;

use encoding_rs::{Encoding, UTF_8};

// Browsers only look this far into a page for a <meta> charset
const META_SNIFF_BYTES: usize = 1024;

/// Returned by [`FetchBuffer::append`] when a chunk would push the buffer
/// past its cap. The chunk is not appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapExceeded {
    pub cap: usize,
    pub attempted: usize,
}

/// Accumulates the body of one fetched page.
#[derive(Debug)]
pub struct FetchBuffer {
    bytes: Vec<u8>,
    cap: usize,
    declared: Option<&'static Encoding>,
}

impl FetchBuffer {
    /// Creates an empty buffer that refuses to grow past `cap` bytes.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            bytes: Vec::new(),
            cap,
            declared: None,
        }
    }

    /// Records the charset the server announced for this body.
    ///
    /// Unknown labels are ignored and decoding falls back to sniffing.
    pub fn declare_charset(&mut self, label: &str) {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) => self.declared = Some(encoding),
            None => tracing::debug!(label, "unknown charset label, ignoring"),
        }
    }

    /// Appends one delivered chunk.
    ///
    /// The whole chunk is copied or nothing is. If the allocator cannot
    /// provide the extra capacity the process is aborted.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), CapExceeded> {
        let attempted = self.bytes.len().saturating_add(chunk.len());
        if attempted > self.cap {
            return Err(CapExceeded {
                cap: self.cap,
                attempted,
            });
        }

        if let Err(e) = self.bytes.try_reserve(chunk.len()) {
            exhausted(attempted, e);
        }
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Text view of the body, what the parser consumes.
    pub fn as_text(&self) -> Cow<'_, str> {
        let encoding = self
            .declared
            .or_else(|| sniff_meta_charset(&self.bytes))
            .unwrap_or(UTF_8);

        // decode() lets a BOM override `encoding`
        let (text, used, had_errors) = encoding.decode(&self.bytes);
        if had_errors {
            tracing::debug!(encoding = used.name(), "body had bytes outside its encoding");
        }
        text
    }
}

// Looks for `charset=` inside the <meta> tags at the top of the page.
// Covers both <meta charset="..."> and
// <meta http-equiv="Content-Type" content="text/html; charset=...">.
fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SNIFF_BYTES)];
    let head = head.to_ascii_lowercase();

    let mut rest = head.as_slice();
    while let Some(start) = find(rest, b"<meta") {
        let tag = &rest[start..];
        let tag = &tag[..find(tag, b">").unwrap_or(tag.len())];

        if let Some(at) = find(tag, b"charset") {
            let value = tag[at + b"charset".len()..]
                .iter()
                .skip_while(|b| b.is_ascii_whitespace() || **b == b'=' || **b == b'"' || **b == b'\'')
                .take_while(|b| b.is_ascii_alphanumeric() || matches!(**b, b'-' | b'_' | b':' | b'.'))
                .copied()
                .collect::<Vec<u8>>();

            // A page cannot declare itself UTF-16 from inside its own bytes;
            // output_encoding() maps that case back to UTF-8
            if let Some(encoding) = Encoding::for_label(&value) {
                return Some(encoding.output_encoding());
            }
        }
        rest = &rest[start + tag.len()..];
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

// Resource exhaustion while growing a buffer is not a per-request failure.
// A worker that cannot allocate cannot reply either, so the process stops.
fn exhausted(requested: usize, err: TryReserveError) -> ! {
    tracing::error!(requested, error = %err, "fetch buffer allocation failed, aborting");
    std::process::abort()
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why try_reserve instead of push/extend directly?
//    - extend_from_slice aborts deep inside the allocator on failure
//    - try_reserve hands us the error first, so the abort is logged and
//      happens in one well-known place
//
// 2. What does the `-> !` return type mean?
//    - "never returns"; abort() ends the process
//    - The compiler knows code after a call to exhausted() is unreachable
//
// 3. Why saturating_add?
//    - len + chunk could overflow usize on a hostile stream
//    - saturating_add clamps at usize::MAX, which is always above the cap
//
// 4. Why not just String::from_utf8_lossy?
//    - Plenty of pages are still served as ISO-8859-1 or Shift_JIS
//    - Read as UTF-8, every non-ASCII byte in their links would turn
//      into U+FFFD
//    - encoding_rs is the decoder reqwest itself uses for text()
// -----------------------------------------------------------------------------
