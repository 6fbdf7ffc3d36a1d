// src/model/mod.rs

//! Core records produced by feed compilation: implementations and their
//! dependencies, commands and bindings, plus the stability ladder.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use strum_macros::{Display, EnumString};

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::restriction::Restriction;
use crate::tree::{AttrMap, Element};
use crate::version::Version;

/// Distribution token matching implementations the injector manages
/// itself (the Cache and Local kinds), as opposed to packages provided
/// by the host distribution.
pub const FEED_DISTRO_NAME: &str = "0install";

/// Quality/trust tier of an implementation. Declaration order is the
/// preference order used during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Stability {
    Insecure,
    Buggy,
    Developer,
    Testing,
    Stable,
    /// Assigned automatically to distribution packages; never set by feeds.
    Packaged,
    /// Pins an implementation from user overrides; never set by feeds.
    Preferred,
}

impl Stability {
    /// True for the levels only user overrides may assign.
    pub fn is_user_only(self) -> bool {
        matches!(self, Stability::Packaged | Stability::Preferred)
    }

    /// Parse a stability name. Feeds (`from_user` false) may not claim
    /// the user-only levels.
    pub fn parse(s: &str, from_user: bool) -> Result<Self> {
        let level: Stability = s
            .parse()
            .map_err(|_| Error::UnknownStability(s.to_string()))?;
        if !from_user && level.is_user_only() {
            return Err(Error::UserOnlyStability(s.to_string()));
        }
        Ok(level)
    }
}

/// How strongly a dependency binds its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Importance {
    /// Resolution fails if the target cannot be selected.
    Essential,
    /// Selected when possible, dropped otherwise.
    Recommended,
    /// Constrains the target's candidates without requiring it.
    Restricts,
}

const BINDING_NAMES: &[&str] = &[
    "environment",
    "executable-in-path",
    "executable-in-var",
    "binding",
    "overlay",
];

/// A binding declaration, carried opaquely for the launcher. The only
/// part the compiler interprets is which command of the bound
/// implementation the binding needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    element: Element,
}

impl Binding {
    pub(crate) fn new(element: Element) -> Self {
        Binding { element }
    }

    /// True if `name` is one of the recognized binding element names.
    pub fn is_binding_name(name: &str) -> bool {
        BINDING_NAMES.contains(&name)
    }

    /// The binding element kind ("environment", "overlay", ...).
    pub fn kind(&self) -> &str {
        self.element.name()
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Name of the command this binding needs from its target, if any.
    /// Executable bindings default to "run"; a generic `<binding>` names
    /// one explicitly or none; environment and overlay bindings never do.
    pub fn command(&self) -> Option<&str> {
        Self::command_of(&self.element)
    }

    pub(crate) fn command_of(element: &Element) -> Option<&str> {
        match element.name() {
            "executable-in-path" | "executable-in-var" => {
                Some(element.attr("command").unwrap_or("run"))
            }
            "binding" => element.attr("command"),
            _ => None,
        }
    }
}

/// A way of running (or testing, or compiling) an implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    /// Relative path of the executable, for commands declared with `path`.
    pub path: Option<String>,
    /// Shell text for commands synthesized from a build-tool attribute.
    pub shell_command: Option<String>,
    pub requires: Vec<Dependency>,
    pub bindings: Vec<Binding>,
    /// The source element, kept for arguments and launcher details this
    /// compiler does not interpret.
    pub element: Element,
}

/// A compiled requires/restricts/runner declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    /// Target interface URI; absolute once compiled (relative references
    /// are resolved against the local feed's directory).
    pub interface: String,
    pub importance: Importance,
    pub restrictions: Vec<Restriction>,
    /// Commands of the target that bindings (and runners) need.
    pub required_commands: BTreeSet<String>,
    /// Only applies when selecting for this OS.
    pub os: Option<String>,
    /// Deprecated "use" filter, carried for compatibility.
    pub use_filter: Option<String>,
}

impl Dependency {
    /// True if the candidate satisfies every restriction (conjunction).
    pub fn meets_restrictions(&self, implementation: &Implementation) -> bool {
        self.restrictions
            .iter()
            .all(|restriction| restriction.meets(implementation))
    }
}

/// Properties inherited down the grouping tree and resolved per
/// implementation: merged attributes, accumulated dependencies and
/// bindings, and the command table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyScope {
    pub attrs: AttrMap,
    pub requires: Vec<Dependency>,
    pub bindings: Vec<Binding>,
    pub commands: BTreeMap<String, Command>,
}

impl PropertyScope {
    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }
}

/// An implementation fetched into the content cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheImpl {
    pub digests: Vec<Digest>,
    /// Recognized retrieval-method elements (archive/file/recipe),
    /// carried opaquely for the fetcher.
    pub retrieval_methods: Vec<Element>,
}

impl CacheImpl {
    /// True if at least one retrieval method can run without network
    /// access.
    pub fn is_retrievable_without_network(&self) -> bool {
        self.retrieval_methods
            .iter()
            .any(|method| !crate::retrieval::requires_network(method))
    }
}

/// Install state of a distribution package implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageState {
    Installed,
    Uninstalled {
        size: Option<u64>,
        /// Opaque (kind, argument) pair handed to the distro integration.
        install_info: (String, String),
    },
}

/// An implementation provided by the host distribution's package manager.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageImpl {
    pub distro: String,
    pub state: PackageState,
}

impl PackageImpl {
    pub fn installed(&self) -> bool {
        matches!(self.state, PackageState::Installed)
    }

    /// Record that the distro integration has installed the package.
    pub fn mark_installed(&mut self) {
        self.state = PackageState::Installed;
    }
}

/// How an implementation's files are obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ImplementationType {
    /// Fetched into the content cache via retrieval methods.
    Cache(CacheImpl),
    /// Already on disk (local feeds only).
    Local(PathBuf),
    /// Provided by the host distribution.
    Package(PackageImpl),
}

impl ImplementationType {
    pub fn is_distro_package(&self) -> bool {
        matches!(self, ImplementationType::Package(_))
    }
}

/// One installable implementation with fully resolved metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Implementation {
    pub id: String,
    pub props: PropertyScope,
    pub stability: Stability,
    pub os: Option<String>,
    pub machine: Option<String>,
    pub version: Version,
    pub kind: ImplementationType,
}

impl Implementation {
    /// Resolved attribute (the override-merge of the ancestor chain).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.props.attrs.get(name)
    }

    pub fn command(&self, name: &str) -> Option<&Command> {
        self.props.command(name)
    }

    /// Distribution name used by distribution restrictions: the distro
    /// for package implementations, [`FEED_DISTRO_NAME`] otherwise.
    pub fn distro_name(&self) -> &str {
        match &self.kind {
            ImplementationType::Package(package) => &package.distro,
            _ => FEED_DISTRO_NAME,
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match &self.kind {
            ImplementationType::Local(path) => Some(path),
            _ => None,
        }
    }

    pub fn digests(&self) -> &[Digest] {
        match &self.kind {
            ImplementationType::Cache(cache) => &cache.digests,
            _ => &[],
        }
    }

    pub fn retrieval_methods(&self) -> &[Element] {
        match &self.kind {
            ImplementationType::Cache(cache) => &cache.retrieval_methods,
            _ => &[],
        }
    }
}
