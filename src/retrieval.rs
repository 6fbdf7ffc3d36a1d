// src/retrieval.rs

//! Classification of retrieval-method elements.
//!
//! The fetcher executes retrieval methods; the compiler only recognizes
//! which children of an implementation describe one, and whether any of
//! them can run without the network.

use crate::feed::FEED_NS;
use crate::tree::Element;

const METHOD_NAMES: &[&str] = &["archive", "file", "recipe"];

/// True if the element describes a way of obtaining implementation files.
pub fn is_retrieval_method(element: &Element) -> bool {
    element.namespace() == Some(FEED_NS) && METHOD_NAMES.contains(&element.name())
}

/// True if executing the method would touch the network.
///
/// Methods this version does not understand report true, so that callers
/// treat them as unavailable offline rather than silently runnable.
pub fn requires_network(element: &Element) -> bool {
    match element.name() {
        "archive" | "file" => has_remote_source(element),
        "recipe" => element.children().iter().any(|step| {
            step.namespace() == Some(FEED_NS)
                && matches!(step.name(), "archive" | "file")
                && has_remote_source(step)
        }),
        _ => true,
    }
}

fn has_remote_source(element: &Element) -> bool {
    match element.attr("src") {
        Some(src) => src.starts_with("http://") || src.starts_with("https://"),
        None => false,
    }
}
