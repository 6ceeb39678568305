// src/extract/html.rs
// =============================================================================
// This module pulls every link target out of an HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Is built on html5ever, so broken markup is repaired, not rejected
// - Lets us walk the element tree directly
//
// What we return is exactly what the page says: href values in the order
// they appear, duplicates kept, relative paths and empty strings untouched.
// No resolution against a base URL, no filtering.
//
// Rust concepts:
// - Option<T>: "there is no document" is a value, not an error
// - Iterators: descendants() walks the tree depth-first
// - let-else: skip nodes that are not elements
// =============================================================================

use scraper::{ElementRef, Html};

// Parses page text into a document
//
// Returns None when there is nothing to build a document from (empty or
// whitespace-only input). Callers treat that as "no links", never as a
// failure.
pub fn parse_document(page: &str) -> Option<Html> {
    if page.trim().is_empty() {
        return None;
    }

    // html5ever records parse errors in document.errors instead of failing;
    // we never look at them
    Some(Html::parse_document(page))
}

// Collects the href of every <a> element, in document order
//
// The walk is depth-first pre-order starting at the root element: an
// element's children are all visited before its next sibling. Tag and
// attribute names are matched case-insensitively.
//
// Example:
//   <div><p><a href="a"></a></p><a href="b"></a></div>
//   result = ["a", "b"]
pub fn extract_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    for node in document.root_element().descendants() {
        // Text, comments and doctypes are walked past, only elements are inspected
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        let tag = element.value().name();
        if tag.eq_ignore_ascii_case("a") {
            for (name, value) in element.value().attrs() {
                if name.eq_ignore_ascii_case("href") {
                    links.push(value.to_string());
                }
            }
        } else if tag.eq_ignore_ascii_case("title") {
            tracing::trace!("title element seen");
        }
    }

    links
}

// Parse + extract in one step, used by the worker
//
// The document is dropped before this function returns, so the parse tree
// never outlives the extraction, whatever the outcome.
pub fn links_in_page(page: &str) -> Vec<String> {
    match parse_document(page) {
        Some(document) => {
            let links = extract_links(&document);
            tracing::trace!(count = links.len(), "links extracted");
            links
        }
        None => {
            tracing::debug!("nothing to parse, replying with no links");
            Vec::new()
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why walk the tree instead of using a CSS selector like "a[href]"?
//    - A selector gives elements, but we want every href attribute on them
//    - Walking keeps the visiting order explicit: depth-first, children
//      before siblings
//
// 2. What does ElementRef::wrap do?
//    - descendants() yields every node: elements, text, comments
//    - wrap() returns Some only for element nodes
//
// 3. Why does an <a> with two href attributes give one link?
//    - The HTML tokenizer keeps the first occurrence and drops repeats
//    - We still loop over every attribute, so nothing is deduplicated here
// -----------------------------------------------------------------------------
