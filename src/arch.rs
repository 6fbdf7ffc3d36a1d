// src/arch.rs

//! Architecture filters of the form "os-machine".

use std::fmt;

use crate::error::{Error, Result};

/// Platform filter attached to implementations and feed imports.
///
/// `None` on either side means unconstrained; the wildcard form is
/// written "*" in documents ("*-*", "Linux-*", "*-x86_64").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arch {
    pub os: Option<String>,
    pub machine: Option<String>,
}

impl Arch {
    /// Parse an "os-machine" pair. Exactly one dash, neither side empty.
    pub fn parse(s: &str) -> Result<Self> {
        let mut sides = s.split('-');
        let (Some(os), Some(machine), None) = (sides.next(), sides.next(), sides.next()) else {
            return Err(malformed(s));
        };
        if os.is_empty() || machine.is_empty() {
            return Err(malformed(s));
        }
        Ok(Arch {
            os: side(os),
            machine: side(machine),
        })
    }

    /// Split into the (os, machine) pair carried on implementations.
    pub fn into_parts(self) -> (Option<String>, Option<String>) {
        (self.os, self.machine)
    }
}

fn malformed(value: &str) -> Error {
    Error::InvalidArch {
        value: value.to_string(),
        context: String::new(),
    }
}

fn side(s: &str) -> Option<String> {
    if s == "*" { None } else { Some(s.to_string()) }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.os.as_deref().unwrap_or("*"),
            self.machine.as_deref().unwrap_or("*")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let arch = Arch::parse("Linux-x86_64").unwrap();
        assert_eq!(arch.os.as_deref(), Some("Linux"));
        assert_eq!(arch.machine.as_deref(), Some("x86_64"));
    }

    #[test]
    fn test_parse_wildcards() {
        let any = Arch::parse("*-*").unwrap();
        assert_eq!(any, Arch::default());

        let os_only = Arch::parse("Darwin-*").unwrap();
        assert_eq!(os_only.os.as_deref(), Some("Darwin"));
        assert_eq!(os_only.machine, None);

        let machine_only = Arch::parse("*-armv7l").unwrap();
        assert_eq!(machine_only.os, None);
        assert_eq!(machine_only.machine.as_deref(), Some("armv7l"));
    }

    #[test]
    fn test_parse_source_pseudo_machine() {
        let arch = Arch::parse("*-src").unwrap();
        assert_eq!(arch.machine.as_deref(), Some("src"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "Linux", "a-b-c", "-x86_64", "Linux-"] {
            assert!(Arch::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Arch::parse("Linux-*").unwrap().to_string(), "Linux-*");
        assert_eq!(Arch::default().to_string(), "*-*");
    }
}
