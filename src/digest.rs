// src/digest.rs

//! Algorithm-tagged content digests.
//!
//! Digests are extracted here and verified by the content store, never
//! by the feed compiler.

use std::fmt;

use crate::feed::FEED_NS;
use crate::tree::Element;

/// A manifest digest such as `sha256new=RPUJP5...`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest {
    pub algorithm: String,
    pub value: String,
}

impl Digest {
    pub fn new(algorithm: impl Into<String>, value: impl Into<String>) -> Self {
        Digest {
            algorithm: algorithm.into(),
            value: value.into(),
        }
    }

    /// Digest embedded in a legacy implementation id ("alg=value").
    pub fn from_id(id: &str) -> Option<Digest> {
        let (algorithm, value) = id.split_once('=')?;
        if algorithm.is_empty() || value.is_empty() {
            return None;
        }
        Some(Digest::new(algorithm, value))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.algorithm, self.value)
    }
}

/// Collect the digests of an implementation node: a digest embedded in
/// the legacy id first, then every namespace-free attribute of each
/// `<manifest-digest>` child.
pub fn extract_digests(node: &Element) -> Vec<Digest> {
    let mut digests = Vec::new();
    if let Some(digest) = node.attr("id").and_then(Digest::from_id) {
        digests.push(digest);
    }
    for child in node.children() {
        if !child.is(FEED_NS, "manifest-digest") {
            continue;
        }
        for (ns, algorithm, value) in child.attrs().iter() {
            if ns.is_empty() {
                digests.push(Digest::new(algorithm, value));
            }
        }
    }
    digests
}
