// src/feed/mod.rs

//! Feed documents and their compiler.
//!
//! A feed is a single XML document describing every known implementation
//! of one interface. [`FeedParser`] turns a parsed element tree into a
//! [`Feed`]: version gates are applied first, then feed-level metadata is
//! collected, and finally the grouping tree is flattened so that every
//! implementation carries its fully merged attributes, dependencies,
//! bindings and commands.

mod extract;
mod groups;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::arch::Arch;
use crate::error::{Error, Result};
use crate::model::{Implementation, PropertyScope};
use crate::tree::{Element, XML_NS};
use crate::version::Version;
use crate::version::expr::VersionExpr;

/// Namespace of feed documents.
pub const FEED_NS: &str = "https://freshet.dev/2024/feed";

/// Namespace of the build tool's extension attributes.
pub const BUILD_NS: &str = "https://freshet.dev/2024/build";

/// Attribute making any element conditional on the running injector
/// version.
const GATE_ATTR: &str = "if-injector-version";

/// Version of the running injector, used by version gates and
/// `min-injector-version` checks.
pub fn injector_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).expect("crate version is a valid feed version")
}

/// Identity of a feed: a remote URL or the absolute path of a local
/// document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeedUrl {
    Remote(String),
    Local(PathBuf),
}

impl FeedUrl {
    pub fn is_local(&self) -> bool {
        matches!(self, FeedUrl::Local(_))
    }

    /// Directory of a local feed document, the base for relative
    /// references.
    pub fn local_dir(&self) -> Option<&Path> {
        match self {
            FeedUrl::Local(path) => path.parent(),
            FeedUrl::Remote(_) => None,
        }
    }
}

impl fmt::Display for FeedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedUrl::Remote(url) => f.write_str(url),
            FeedUrl::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Why a subordinate feed is consulted for an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedImportKind {
    /// Declared by the master feed itself.
    Imported,
    /// Registered by the user.
    UserRegistered,
    /// Found in a site-packages directory.
    SitePackages,
    /// Generated from the host distribution's package manager.
    DistroPackages,
}

/// Reference from a master feed to a subordinate feed with more
/// implementations of the same interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedImport {
    /// Absolute URL, or absolute path for local references.
    pub src: String,
    pub os: Option<String>,
    pub machine: Option<String>,
    /// Languages the referenced feed covers, normalized to '-' subtag
    /// separators. None means no declared restriction.
    pub langs: Option<Vec<String>>,
    pub kind: FeedImportKind,
}

/// Compiled implementations keyed by id.
///
/// Insertion is only possible during compilation and rejects duplicate
/// ids, so a value of this type always satisfies the one-id-one-entry
/// rule. Package implementations never appear here; they stay deferred
/// until a distribution scan supplies their versions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Implementations {
    map: BTreeMap<String, Implementation>,
}

impl Implementations {
    pub(crate) fn insert(&mut self, implementation: Implementation, node: &Element) -> Result<()> {
        debug_assert!(!implementation.kind.is_distro_package());
        if self.map.contains_key(&implementation.id) {
            return Err(Error::DuplicateId {
                id: implementation.id,
                element: node.to_string(),
            });
        }
        self.map
            .insert(implementation.id.clone(), implementation);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Implementation> {
        self.map.get(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Implementation> {
        self.map.values()
    }
}

/// A compiled feed document.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    url: FeedUrl,
    name: String,
    root: Element,
    summaries: Vec<(Option<String>, String)>,
    descriptions: Vec<(Option<String>, String)>,
    categories: Vec<String>,
    needs_terminal: bool,
    feed_for: Vec<String>,
    imports: Vec<FeedImport>,
    replacement: Option<String>,
    implementations: Implementations,
    package_implementations: Vec<(Element, PropertyScope)>,
}

impl Feed {
    pub fn url(&self) -> &FeedUrl {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The gate-filtered root element, for extensions this compiler does
    /// not interpret (icons, entry points, signatures).
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Best summary for a language tag (None asks for English).
    pub fn summary(&self, lang: Option<&str>) -> Option<&str> {
        best_localized(&self.summaries, lang)
    }

    /// All summaries with their language tags, in document order.
    pub fn summaries(&self) -> &[(Option<String>, String)] {
        &self.summaries
    }

    /// Best description for a language tag (None asks for English).
    pub fn description(&self, lang: Option<&str>) -> Option<&str> {
        best_localized(&self.descriptions, lang)
    }

    pub fn descriptions(&self) -> &[(Option<String>, String)] {
        &self.descriptions
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn needs_terminal(&self) -> bool {
        self.needs_terminal
    }

    /// Interfaces this feed adds implementations to.
    pub fn feed_for(&self) -> &[String] {
        &self.feed_for
    }

    pub fn imports(&self) -> &[FeedImport] {
        &self.imports
    }

    /// Interface that supersedes this one, if any.
    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    pub fn implementations(&self) -> &Implementations {
        &self.implementations
    }

    /// Package-implementation templates with their merged scopes. These
    /// only become implementations once a distribution scan fills in
    /// versions and install state.
    pub fn package_implementations(&self) -> &[(Element, PropertyScope)] {
        &self.package_implementations
    }
}

/// Source information threaded through compilation.
pub(crate) struct ParseContext<'a> {
    /// Canonical URL (or path) of the feed being compiled.
    pub(crate) url: &'a str,
    /// Directory of the document for local feeds. Relative references
    /// are only legal when this is present.
    pub(crate) local_dir: Option<&'a Path>,
}

/// Compiles parsed feed documents into [`Feed`] values.
///
/// The parser carries the injector version it evaluates gates against,
/// so tests and tooling can compile feeds as any version would see them.
#[derive(Debug, Clone)]
pub struct FeedParser {
    injector_version: Version,
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedParser {
    pub fn new() -> Self {
        FeedParser {
            injector_version: injector_version(),
        }
    }

    /// A parser that evaluates gates as the given injector version.
    pub fn with_injector_version(version: Version) -> Self {
        FeedParser {
            injector_version: version,
        }
    }

    /// Compile a feed document.
    ///
    /// `local_path` is the absolute path of the document for feeds read
    /// from disk. Remote feeds pass None and must carry a `uri`
    /// attribute on the root element.
    pub fn parse(&self, root: &Element, local_path: Option<&Path>) -> Result<Feed> {
        let root = apply_version_gates(root, &self.injector_version)?.ok_or_else(|| {
            Error::InvalidFeed("the whole feed is gated to other injector versions".to_string())
        })?;

        if !(root.is(FEED_NS, "interface") || root.is(FEED_NS, "feed")) {
            return Err(Error::InvalidFeed(format!(
                "root element must be <interface> or <feed> in {FEED_NS}, not {root}"
            )));
        }

        if let Some(required) = root.attr("min-injector-version") {
            let required = Version::parse(required)?;
            if required > self.injector_version {
                return Err(Error::InjectorTooOld {
                    required: required.to_string(),
                    running: self.injector_version.to_string(),
                });
            }
        }

        let url = match local_path {
            Some(path) => FeedUrl::Local(path.to_path_buf()),
            None => {
                let uri = root.attr("uri").ok_or_else(|| missing_attr("uri", &root))?;
                FeedUrl::Remote(uri.to_string())
            }
        };
        let url_string = url.to_string();
        let ctx = ParseContext {
            url: &url_string,
            local_dir: url.local_dir(),
        };

        let mut name = None;
        let mut summaries = Vec::new();
        let mut descriptions = Vec::new();
        let mut categories = Vec::new();
        let mut needs_terminal = false;
        let mut feed_for = Vec::new();
        let mut imports = Vec::new();
        let mut replacement = None;

        for child in feed_children(&root) {
            match child.name() {
                // The first name is the feed's name
                "name" => {
                    if name.is_none() {
                        name = Some(child.text().to_string());
                    }
                }
                "summary" => summaries.push((lang_of(child), child.text().to_string())),
                "description" => descriptions.push((lang_of(child), child.text().to_string())),
                "category" => categories.push(child.text().to_string()),
                "needs-terminal" => needs_terminal = true,
                "feed" => imports.push(parse_import(child, &ctx)?),
                "feed-for" => {
                    let interface = child
                        .attr("interface")
                        .ok_or_else(|| missing_attr("interface", child))?;
                    feed_for.push(interface.to_string());
                }
                "replaced-by" => {
                    if replacement.is_some() {
                        return Err(Error::InvalidFeed(format!(
                            "more than one replaced-by declaration (in {child})"
                        )));
                    }
                    let interface = child
                        .attr("interface")
                        .ok_or_else(|| missing_attr("interface", child))?;
                    replacement = Some(normalize_url(interface, ctx.local_dir, child)?);
                }
                _ => {}
            }
        }

        let name = name
            .ok_or_else(|| Error::InvalidFeed(format!("missing <name> in feed {url_string}")))?;

        let mut seed = PropertyScope::default();
        seed.attrs.insert("stability", "testing");
        seed.attrs.insert("from-feed", url_string.as_str());
        if let Some(main) = root.attr("main") {
            let synthetic = Element::in_namespace(FEED_NS, "command")
                .with_attr("name", "run")
                .with_attr("path", main);
            let command = extract::parse_command(&synthetic, &ctx)?;
            seed.commands.insert("run".to_string(), command);
        }

        let (implementations, package_implementations) = groups::compile(&root, seed, &ctx)?;

        debug!(
            "compiled feed {}: {} implementations, {} package templates",
            url_string,
            implementations.len(),
            package_implementations.len()
        );

        Ok(Feed {
            url,
            name,
            root,
            summaries,
            descriptions,
            categories,
            needs_terminal,
            feed_for,
            imports,
            replacement,
            implementations,
            package_implementations,
        })
    }

    /// Read and compile a feed document from disk.
    pub fn parse_file(&self, path: &Path) -> Result<Feed> {
        let path = std::path::absolute(path)?;
        let root = crate::tree::xml::parse_file(&path)?;
        self.parse(&root, Some(&path))
    }
}

/// Apply `if-injector-version` gates: drop elements whose expression does
/// not match the running version, strip the attribute from survivors.
/// Returns None when the element itself is gated away.
fn apply_version_gates(node: &Element, running: &Version) -> Result<Option<Element>> {
    if let Some(gate) = node.attr(GATE_ATTR) {
        let gate = VersionExpr::parse(gate)?;
        if !gate.matches(running) {
            debug!("dropping {node}: needs injector version {gate}");
            return Ok(None);
        }
    }
    let mut kept = node.without_children();
    kept.remove_attr(GATE_ATTR);
    for child in node.children() {
        if let Some(child) = apply_version_gates(child, running)? {
            kept.push_child(child);
        }
    }
    Ok(Some(kept))
}

fn parse_import(child: &Element, ctx: &ParseContext<'_>) -> Result<FeedImport> {
    let src = child.attr("src").ok_or_else(|| missing_attr("src", child))?;
    let src = normalize_url(src, ctx.local_dir, child)?;
    let (os, machine) = match child.attr("arch") {
        Some(value) => Arch::parse(value).map_err(|e| e.at(child))?.into_parts(),
        None => (None, None),
    };
    let langs = child.attr("langs").map(|langs| {
        langs
            .replace('_', "-")
            .split_whitespace()
            .map(str::to_string)
            .collect()
    });
    Ok(FeedImport {
        src,
        os,
        machine,
        langs,
        kind: FeedImportKind::Imported,
    })
}

fn lang_of(element: &Element) -> Option<String> {
    element.attr_ns(XML_NS, "lang").map(str::to_string)
}

/// Pick the entry best matching a language tag: exact match first, then
/// same primary subtag, then English, then the first entry. Entries
/// without a tag count as English; None asks for English.
fn best_localized<'a>(
    entries: &'a [(Option<String>, String)],
    lang: Option<&str>,
) -> Option<&'a str> {
    fn normalize(tag: &str) -> String {
        tag.replace('_', "-").to_ascii_lowercase()
    }
    fn tag_of(entry: &Option<String>) -> String {
        match entry {
            Some(tag) => normalize(tag),
            None => "en".to_string(),
        }
    }

    let want = normalize(lang.unwrap_or("en"));
    if let Some((_, text)) = entries.iter().find(|(tag, _)| tag_of(tag) == want) {
        return Some(text);
    }
    let primary = want.split('-').next().unwrap_or_default();
    if let Some((_, text)) = entries
        .iter()
        .find(|(tag, _)| tag_of(tag).split('-').next() == Some(primary))
    {
        return Some(text);
    }
    if let Some((_, text)) = entries.iter().find(|(tag, _)| tag_of(tag) == "en") {
        return Some(text);
    }
    entries.first().map(|(_, text)| text.as_str())
}

/// Children of an element that live in the feed namespace.
pub(crate) fn feed_children(node: &Element) -> impl Iterator<Item = &Element> {
    node.children()
        .iter()
        .filter(|child| child.namespace() == Some(FEED_NS))
}

pub(crate) fn missing_attr(name: &str, node: &Element) -> Error {
    Error::InvalidFeed(format!("missing attribute '{name}' in {node}"))
}

/// Resolve a reference to another feed or interface.
///
/// Absolute http(s) URLs pass through. Anything else is a path, legal
/// only in local feeds, resolved absolute against the referring
/// document's directory (already-absolute paths pass intact).
pub(crate) fn normalize_url(
    value: &str,
    local_dir: Option<&Path>,
    node: &Element,
) -> Result<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Ok(value.to_string());
    }
    match local_dir {
        // join replaces on absolute values, so those come through as-is
        Some(dir) => Ok(normalize_path(&dir.join(value)).display().to_string()),
        None if value.starts_with('.') => Err(Error::InvalidFeed(format!(
            "relative reference '{value}' in remote feed (in {node})"
        ))),
        None => Err(Error::InvalidFeed(format!(
            "'{value}' is not a feed URL (in {node})"
        ))),
    }
}

/// Resolve `.` and `..` components lexically, without touching the
/// filesystem.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // ".." at the root stays at the root
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(Component::ParentDir),
            },
            other => out.push(other),
        }
    }
    out
}
