// src/overrides.rs

//! Per-feed user preferences.
//!
//! Each feed gets one small XML file under the user's configuration
//! directory recording when the feed was last checked and which
//! implementations the user has pinned to another stability level.
//! Writes go through a temporary file and an atomic rename, with the
//! file readable only by its owner.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::Stability;
use crate::tree::xml;

/// User preferences for one feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedOverrides {
    /// When the feed was last fetched successfully. Stored with whole
    /// second precision.
    pub last_checked: Option<DateTime<Utc>>,
    /// Stability pins keyed by implementation id. These may use the
    /// user-only levels that feeds themselves cannot claim.
    pub user_stability: BTreeMap<String, Stability>,
}

/// Directory of per-feed override files.
#[derive(Debug, Clone)]
pub struct OverridesStore {
    dir: PathBuf,
}

impl OverridesStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        OverridesStore { dir: dir.into() }
    }

    /// Store under the user's configuration directory.
    pub fn open_default() -> Result<Self> {
        let config = dirs::config_dir().ok_or(Error::NoConfigDir)?;
        Ok(Self::new(config.join("freshet").join("feeds")))
    }

    /// File holding the overrides of the given feed.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(escape_pretty(url))
    }

    /// Load the overrides of a feed. A missing file means no overrides;
    /// a file that exists but cannot be understood is an error.
    pub fn load(&self, url: &str) -> Result<FeedOverrides> {
        let path = self.path_for(url);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no overrides for {}", url);
                return Ok(FeedOverrides::default());
            }
            Err(err) => return Err(err.into()),
        };

        let root = xml::parse_str(&text).map_err(|err| corrupt(&path, err))?;

        let mut overrides = FeedOverrides::default();
        if let Some(stamp) = root.attr("last-checked") {
            let seconds: i64 = stamp
                .parse()
                .map_err(|_| corrupt(&path, format!("bad last-checked timestamp '{stamp}'")))?;
            let when = DateTime::from_timestamp(seconds, 0)
                .ok_or_else(|| corrupt(&path, format!("last-checked {seconds} out of range")))?;
            overrides.last_checked = Some(when);
        }
        for child in root.children() {
            if child.name() != "implementation" {
                continue;
            }
            let id = child
                .attr("id")
                .ok_or_else(|| corrupt(&path, "implementation entry without id"))?;
            if let Some(level) = child.attr("user-stability") {
                let stability =
                    Stability::parse(level, true).map_err(|err| corrupt(&path, err))?;
                overrides.user_stability.insert(id.to_string(), stability);
            }
        }
        Ok(overrides)
    }

    /// Write the overrides of a feed, replacing any previous file.
    pub fn save(&self, url: &str, overrides: &FeedOverrides) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        let mut root = BytesStart::new("feed-preferences");
        root.push_attribute(("uri", url));
        let stamp = overrides.last_checked.map(|when| when.timestamp().to_string());
        if let Some(stamp) = &stamp {
            root.push_attribute(("last-checked", stamp.as_str()));
        }
        if overrides.user_stability.is_empty() {
            writer.write_event(Event::Empty(root))?;
        } else {
            writer.write_event(Event::Start(root))?;
            for (id, stability) in &overrides.user_stability {
                let mut entry = BytesStart::new("implementation");
                entry.push_attribute(("id", id.as_str()));
                let level = stability.to_string();
                entry.push_attribute(("user-stability", level.as_str()));
                writer.write_event(Event::Empty(entry))?;
            }
            writer.write_event(Event::End(BytesEnd::new("feed-preferences")))?;
        }
        let mut body = writer.into_inner();
        body.push(b'\n');

        let path = self.path_for(url);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&body)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        tmp.persist(&path).map_err(|err| err.error)?;
        debug!("saved overrides for {} to {}", url, path.display());
        Ok(())
    }

    /// Record a successful feed check now. The timestamp is truncated to
    /// whole seconds, so the value returned equals what a reload sees.
    pub fn touch(&self, url: &str) -> Result<FeedOverrides> {
        let mut overrides = self.load(url)?;
        overrides.last_checked = DateTime::from_timestamp(Utc::now().timestamp(), 0);
        self.save(url, &overrides)?;
        Ok(overrides)
    }
}

fn corrupt(path: &Path, detail: impl fmt::Display) -> Error {
    Error::InvalidOverrides(format!("{}: {}", path.display(), detail))
}

/// Escape a feed URL to a single filename, keeping it readable: bytes
/// outside `[-_.a-zA-Z0-9:]` become `%xx` (lowercase hex) and `/`
/// separators are written as `#`.
pub fn escape_pretty(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for &byte in url.as_bytes() {
        match byte {
            b'/' => out.push('#'),
            b'-' | b'_' | b'.' | b':' => out.push(byte as char),
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => out.push(byte as char),
            _ => {
                out.push_str(&format!("%{byte:02x}"));
            }
        }
    }
    out
}
