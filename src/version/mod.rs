// src/version/mod.rs

//! Feed version parsing and ordering.
//!
//! Feed versions are dotted integer lists separated by named modifiers:
//!
//! ```text
//! Version    := DottedList ("-" Modifier DottedList?)*
//! DottedList := Integer ("." Integer)*
//! Modifier   := "" | "pre" | "rc" | "post"
//! ```
//!
//! Modifiers order as pre < rc < (plain) < post, so "1.0-pre1" sorts
//! before "1.0-rc1", which sorts before "1.0", which sorts before
//! "1.0-post". Comparison is lexicographic over the parsed parts, so a
//! version that extends another is the later one ("1.0" < "1.0.0").

pub mod expr;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Named modifier separating dotted lists inside a version.
///
/// The declaration order is the comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Pre,
    Rc,
    /// The empty modifier, written as a bare "-" between dotted lists.
    Release,
    Post,
}

impl Modifier {
    fn parse(word: &str, whole: &str) -> Result<Self> {
        match word {
            "" => Ok(Modifier::Release),
            "pre" => Ok(Modifier::Pre),
            "rc" => Ok(Modifier::Rc),
            "post" => Ok(Modifier::Post),
            other => Err(invalid(
                whole,
                format!("unknown version modifier '{}'", other),
            )),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Modifier::Pre => "pre",
            Modifier::Rc => "rc",
            Modifier::Release => "",
            Modifier::Post => "post",
        }
    }
}

/// One dotted list plus the modifier that follows it (the final part
/// carries `Release` when the string ends without a modifier).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct VersionPart {
    dotted: Vec<i64>,
    modifier: Modifier,
}

/// A parsed feed version with a total order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    parts: Vec<VersionPart>,
}

impl Version {
    /// Parse a version string.
    ///
    /// Examples:
    /// - "1.2.3"
    /// - "1.0-pre2" (second pre-release of 1.0)
    /// - "1.0-post" (bug-fixed repackaging of 1.0)
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(invalid(s, "empty version string".to_string()));
        }

        let mut parts = Vec::new();
        let mut rest = s;
        loop {
            match rest.find('-') {
                None => {
                    parts.push(VersionPart {
                        dotted: parse_dotted(rest, s)?,
                        modifier: Modifier::Release,
                    });
                    break;
                }
                Some(i) => {
                    let dotted = parse_dotted(&rest[..i], s)?;
                    let after = &rest[i + 1..];
                    let word_len = after
                        .bytes()
                        .take_while(|b| b.is_ascii_lowercase())
                        .count();
                    let modifier = Modifier::parse(&after[..word_len], s)?;
                    parts.push(VersionPart { dotted, modifier });
                    rest = &after[word_len..];
                    if rest.is_empty() {
                        // String ends with a modifier ("1.0-pre")
                        break;
                    }
                }
            }
        }

        Ok(Version { parts })
    }
}

fn parse_dotted(s: &str, whole: &str) -> Result<Vec<i64>> {
    if s.is_empty() {
        return Err(invalid(whole, "expected version numbers".to_string()));
    }
    s.split('.')
        .map(|seg| {
            seg.parse::<i64>()
                .map_err(|_| invalid(whole, format!("'{}' is not a number", seg)))
        })
        .collect()
}

fn invalid(value: &str, reason: String) -> Error {
    Error::InvalidVersion {
        value: value.to_string(),
        reason,
        context: String::new(),
    }
}

/// Canonical form: `parse` of the output yields an equal version. Input
/// quirks such as a trailing "-" do not survive the round trip.
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            let dotted: Vec<String> = part.dotted.iter().map(i64::to_string).collect();
            f.write_str(&dotted.join("."))?;

            let last = i + 1 == self.parts.len();
            match part.modifier {
                Modifier::Release if last => {}
                modifier => {
                    write!(f, "-{}", modifier.suffix())?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    // === Parsing ===

    #[test]
    fn test_parse_simple() {
        assert_eq!(v("1.2.3").to_string(), "1.2.3");
        assert_eq!(v("0").to_string(), "0");
        assert_eq!(v("1.0.2-post1").to_string(), "1.0.2-post1");
    }

    #[test]
    fn test_parse_modifiers() {
        assert_eq!(v("1.0-pre").to_string(), "1.0-pre");
        assert_eq!(v("1.0-pre2").to_string(), "1.0-pre2");
        assert_eq!(v("1.0-rc1").to_string(), "1.0-rc1");
        assert_eq!(v("1.0-post2-pre").to_string(), "1.0-post2-pre");
    }

    #[test]
    fn test_parse_bare_dash_is_empty_modifier() {
        // "1-2" is two dotted lists joined by the empty modifier
        assert_eq!(v("1-2").to_string(), "1-2");
        // A trailing empty modifier normalizes away
        assert_eq!(v("1.0-").to_string(), "1.0");
        assert_eq!(v("1.0-"), v("1.0"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "", "hello", "1.0-beta", "1..2", ".", "-1", "1.0-pre-rc", "1.0-PRE", "1 .0",
        ] {
            assert!(Version::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    // === Ordering ===

    #[test]
    fn test_total_order() {
        let ordered = [
            "0.9",
            "1.0-pre1",
            "1.0-pre99",
            "1.0",
            "1.0.0",
            "1.0.0-post",
            "1.0.1",
            "1.0.2-pre",
            "1.0.2-pre1",
            "1.0.2-rc1",
            "1.0.2",
            "1.0.2-0",
            "1.0.2-post",
            "1.0.2-post1-pre",
            "1.0.2-post1",
            "1.0.3-pre",
            "1.1",
            "2.0",
        ];
        for pair in ordered.windows(2) {
            assert!(
                v(pair[0]) < v(pair[1]),
                "expected {} < {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_equality() {
        assert_eq!(v("1.0"), v("1.0"));
        assert_ne!(v("1.0"), v("1.0.0"));
        assert_ne!(v("1.0"), v("1.0-pre"));
    }

    #[test]
    fn test_from_str() {
        let parsed: Version = "2.4-rc2".parse().unwrap();
        assert_eq!(parsed, v("2.4-rc2"));
    }
}
