// src/error.rs

//! Central error and result types for feed compilation and the
//! overrides store.

use thiserror::Error;

/// Errors produced while compiling feeds or accessing the overrides store.
#[derive(Debug, Error)]
pub enum Error {
    /// Structural problem in a feed document: wrong root element, missing
    /// required attribute, duplicate declaration, or a locality violation
    /// (relative reference in a non-local feed).
    #[error("invalid feed: {0}")]
    InvalidFeed(String),

    /// Two implementations in the same feed share an id.
    #[error("duplicate implementation id '{id}' (in {element})")]
    DuplicateId { id: String, element: String },

    /// The feed demands a newer injector than the one evaluating it.
    #[error("feed requires injector version {required} or later, but this is {running}")]
    InjectorTooOld { required: String, running: String },

    /// A version string did not match the feed version grammar.
    #[error("invalid version '{value}': {reason}{context}")]
    InvalidVersion {
        value: String,
        reason: String,
        context: String,
    },

    /// A version expression (ranges joined by '|') did not parse.
    #[error("invalid version expression '{expr}': {reason}")]
    InvalidVersionExpression { expr: String, reason: String },

    /// An architecture string was not of the form "os-machine".
    #[error("invalid architecture '{value}': expected 'os-machine'{context}")]
    InvalidArch { value: String, context: String },

    /// A stability name outside the known set.
    #[error("unknown stability level '{0}'")]
    UnknownStability(String),

    /// A user-only stability level (packaged/preferred) appeared in a feed.
    #[error("stability level '{0}' can only be set by the user")]
    UserOnlyStability(String),

    /// A well-formedness problem the tree builder detects itself:
    /// no root, several roots, or an undeclared namespace prefix.
    #[error("malformed document: {0}")]
    InvalidDocument(String),

    /// The underlying XML could not be tokenized or namespace-resolved.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An overrides file exists but cannot be understood.
    #[error("corrupt overrides file: {0}")]
    InvalidOverrides(String),

    /// No per-user configuration directory is available on this platform.
    #[error("no user configuration directory available")]
    NoConfigDir,

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attach the offending element to a format error so diagnostics can
    /// point at the node that carried the bad value.
    pub(crate) fn at(mut self, node: &crate::tree::Element) -> Self {
        let ctx = format!(" (in {node})");
        match &mut self {
            Error::InvalidVersion { context, .. } | Error::InvalidArch { context, .. } => {
                *context = ctx;
            }
            _ => {}
        }
        self
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
