// src/lib.rs

//! Freshet Feed Compiler
//!
//! Feed model for the Freshet decentralized application installer. A
//! feed is one XML document listing every known implementation of an
//! interface, where to get them, and what they need to run. This crate
//! compiles documents into flat, queryable values; fetching, solving
//! and launching live in the other crates of the injector.
//!
//! # Architecture
//!
//! - Tree-first: documents become generic element trees before any feed
//!   semantics apply, so version gates and extensions stay uniform
//! - Scoped inheritance: groups pass attributes, dependencies, bindings
//!   and commands down to their implementations, inner declarations win
//! - Flat output: compilation ends in a per-id implementation map with
//!   nothing left to inherit
//! - User overrides: per-feed stability pins and check times, written
//!   atomically under the user's configuration directory

pub mod arch;
pub mod digest;
mod error;
pub mod feed;
pub mod model;
pub mod overrides;
pub mod restriction;
pub mod retrieval;
pub mod tree;
pub mod version;

pub use arch::Arch;
pub use digest::Digest;
pub use error::{Error, Result};
pub use feed::{
    BUILD_NS, FEED_NS, Feed, FeedImport, FeedImportKind, FeedParser, FeedUrl, Implementations,
    injector_version,
};
pub use model::{
    Binding, CacheImpl, Command, Dependency, Implementation, ImplementationType, Importance,
    PackageImpl, PackageState, PropertyScope, Stability,
};
pub use overrides::{FeedOverrides, OverridesStore, escape_pretty};
pub use restriction::Restriction;
pub use tree::Element;
pub use version::Version;
pub use version::expr::VersionExpr;
