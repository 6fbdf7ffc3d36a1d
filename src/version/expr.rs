// src/version/expr.rs

//! Compiled version expressions.
//!
//! An expression is a list of ranges joined by `|`, satisfied when any
//! one range accepts the version:
//!
//! ```text
//! Expression := Range ("|" Range)*
//! Range      := Version            (exactly that version)
//!             | "!" Version        (anything but that version)
//!             | Low? ".." ("!" High)?
//! ```
//!
//! An upper bound is always exclusive; `LOW..HIGH` without the `!` is
//! rejected so the inclusive reading cannot be written by accident.

use std::fmt;

use crate::error::{Error, Result};
use crate::version::Version;

/// One compiled range of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Range {
    Exact(Version),
    Not(Version),
    Bounds {
        not_before: Option<Version>,
        before: Option<Version>,
    },
}

impl Range {
    fn matches(&self, version: &Version) -> bool {
        match self {
            Range::Exact(v) => version == v,
            Range::Not(v) => version != v,
            Range::Bounds { not_before, before } => {
                not_before.as_ref().is_none_or(|low| version >= low)
                    && before.as_ref().is_none_or(|high| version < high)
            }
        }
    }
}

/// A compiled version expression, remembering its source text for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionExpr {
    source: String,
    ranges: Vec<Range>,
}

impl VersionExpr {
    /// Compile an expression such as `"1.2..!2 | 2.3"`.
    pub fn parse(expr: &str) -> Result<Self> {
        let ranges = expr
            .split('|')
            .map(|range| {
                parse_range(range.trim()).map_err(|reason| Error::InvalidVersionExpression {
                    expr: expr.to_string(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            source: expr.to_string(),
            ranges,
        })
    }

    /// True if any range of the expression accepts the version.
    pub fn matches(&self, version: &Version) -> bool {
        self.ranges.iter().any(|range| range.matches(version))
    }

    /// The expression text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for VersionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_range(range: &str) -> std::result::Result<Range, String> {
    if let Some((low, high)) = range.split_once("..") {
        let not_before = if low.is_empty() {
            None
        } else {
            Some(Version::parse(low).map_err(|e| e.to_string())?)
        };
        let before = if high.is_empty() {
            None
        } else {
            let high = high.strip_prefix('!').ok_or_else(|| {
                format!("end of range '{}' must be exclusive (use '..!{}')", range, high)
            })?;
            Some(Version::parse(high).map_err(|e| e.to_string())?)
        };
        Ok(Range::Bounds { not_before, before })
    } else if let Some(version) = range.strip_prefix('!') {
        Ok(Range::Not(Version::parse(version).map_err(|e| e.to_string())?))
    } else {
        Ok(Range::Exact(
            Version::parse(range).map_err(|e| e.to_string())?,
        ))
    }
}
