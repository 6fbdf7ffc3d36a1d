// tests/common/mod.rs

//! Shared fixtures for the integration tests.

use std::path::Path;

use freshet::tree::xml;
use freshet::{Feed, FeedParser, Result, Version};

/// Compile a remote feed document as injector version `running`.
pub fn parse_remote(text: &str, running: &str) -> Result<Feed> {
    parser(running).parse(&xml::parse_str(text)?, None)
}

/// Compile a feed document read from `path` as injector version
/// `running`.
pub fn parse_local(text: &str, path: &str, running: &str) -> Result<Feed> {
    parser(running).parse(&xml::parse_str(text)?, Some(Path::new(path)))
}

fn parser(running: &str) -> FeedParser {
    FeedParser::with_injector_version(Version::parse(running).unwrap())
}
