// src/restriction.rs

//! Compiled candidate filters for dependencies.
//!
//! Each restriction is a closed variant with a pure evaluator; a
//! dependency is satisfiable by a candidate only if every one of its
//! restrictions accepts it.

use std::collections::BTreeSet;
use std::fmt;

use tracing::warn;

use crate::model::Implementation;
use crate::version::Version;
use crate::version::expr::VersionExpr;

/// A predicate over implementations.
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    /// Half-open version window: `not_before <= version < before`.
    Range {
        not_before: Option<Version>,
        before: Option<Version>,
    },
    /// Compiled version expression.
    Expression(VersionExpr),
    /// At least one distribution token must match the candidate's
    /// distribution name.
    Distribution { distros: BTreeSet<String> },
    /// Never satisfied; records why.
    Impossible { reason: String },
}

impl Restriction {
    pub fn range(not_before: Option<Version>, before: Option<Version>) -> Self {
        Restriction::Range { not_before, before }
    }

    /// Compile a version expression. A malformed expression degrades to
    /// [`Restriction::Impossible`] with a warning rather than aborting
    /// the surrounding parse; only the owning dependency becomes
    /// unsatisfiable.
    pub fn expression(expr: &str) -> Self {
        match VersionExpr::parse(expr) {
            Ok(compiled) => Restriction::Expression(compiled),
            Err(err) => {
                let reason = err.to_string();
                warn!("treating dependency as unsatisfiable: {}", reason);
                Restriction::Impossible { reason }
            }
        }
    }

    /// Filter on whitespace-separated distribution tokens.
    pub fn distribution(tokens: &str) -> Self {
        Restriction::Distribution {
            distros: tokens.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn impossible(reason: impl Into<String>) -> Self {
        Restriction::Impossible {
            reason: reason.into(),
        }
    }

    /// Evaluate against a candidate.
    pub fn meets(&self, implementation: &Implementation) -> bool {
        match self {
            Restriction::Range { not_before, before } => {
                not_before
                    .as_ref()
                    .is_none_or(|low| &implementation.version >= low)
                    && before
                        .as_ref()
                        .is_none_or(|high| &implementation.version < high)
            }
            Restriction::Expression(expr) => expr.matches(&implementation.version),
            Restriction::Distribution { distros } => {
                distros.contains(implementation.distro_name())
            }
            Restriction::Impossible { .. } => false,
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Restriction::Range {
                not_before: None,
                before: None,
            } => write!(f, "any version"),
            Restriction::Range {
                not_before: Some(low),
                before: None,
            } => write!(f, "{} <= version", low),
            Restriction::Range {
                not_before: None,
                before: Some(high),
            } => write!(f, "version < {}", high),
            Restriction::Range {
                not_before: Some(low),
                before: Some(high),
            } => write!(f, "{} <= version < {}", low, high),
            Restriction::Expression(expr) => write!(f, "version {}", expr),
            Restriction::Distribution { distros } => {
                write!(f, "distribution ")?;
                for (i, distro) in distros.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(distro)?;
                }
                Ok(())
            }
            Restriction::Impossible { reason } => write!(f, "<impossible: {}>", reason),
        }
    }
}
