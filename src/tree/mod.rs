// src/tree/mod.rs

//! Generic attributed element tree.
//!
//! Feed documents are compiled from this representation rather than from
//! raw XML events, so the compiler only ever sees named elements, ordered
//! children, (namespace, name)-keyed attributes and trimmed text. The
//! `xml` submodule produces trees from documents; the compiler itself
//! never mutates its input, it derives filtered copies where needed.

pub mod xml;

use std::collections::BTreeMap;
use std::fmt;

/// The XML namespace bound to the reserved `xml:` prefix (`xml:lang`).
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Attribute set keyed by (namespace, local name).
///
/// Attributes without a namespace use the empty string as their key's
/// namespace part. Iteration order is deterministic (sorted by key),
/// which keeps diagnostics and serialized output stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrMap {
    map: BTreeMap<(String, String), String>,
}

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an attribute with no namespace.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_ns("", name)
    }

    /// Look up an attribute in a specific namespace.
    pub fn get_ns(&self, ns: &str, name: &str) -> Option<&str> {
        self.map
            .get(&(ns.to_string(), name.to_string()))
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert an attribute with no namespace, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.insert((String::new(), name.into()), value.into());
    }

    /// Insert an attribute in a specific namespace.
    pub fn insert_ns(
        &mut self,
        ns: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.map.insert((ns.into(), name.into()), value.into());
    }

    /// Remove an attribute with no namespace, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.map.remove(&(String::new(), name.to_string()))
    }

    /// Builder form of [`AttrMap::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Merge `child` over `self`: the child's pairs win on key collision,
    /// every other pair of `self` is retained. Neither input is modified.
    pub fn override_with(&self, child: &AttrMap) -> AttrMap {
        let mut merged = self.clone();
        for ((ns, name), value) in &child.map {
            merged
                .map
                .insert((ns.clone(), name.clone()), value.clone());
        }
        merged
    }

    /// Iterate as (namespace, name, value) triples in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.map
            .iter()
            .map(|((ns, name), value)| (ns.as_str(), name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// One element of a parsed document: tag, attributes, ordered children
/// and trimmed text content.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    namespace: Option<String>,
    name: String,
    attrs: AttrMap,
    children: Vec<Element>,
    text: String,
}

impl Element {
    /// Create an element with no namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            attrs: AttrMap::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    /// Create an element in the given namespace.
    pub fn in_namespace(ns: impl Into<String>, name: impl Into<String>) -> Self {
        let mut elem = Self::new(name);
        elem.namespace = Some(ns.into());
        elem
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// True if the element has the given namespace and local name.
    pub fn is(&self, ns: &str, name: &str) -> bool {
        self.namespace.as_deref() == Some(ns) && self.name == name
    }

    /// Attribute with no namespace.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    /// Attribute in a specific namespace.
    pub fn attr_ns(&self, ns: &str, name: &str) -> Option<&str> {
        self.attrs.get_ns(ns, name)
    }

    pub fn attrs(&self) -> &AttrMap {
        &self.attrs
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Trimmed concatenation of the element's direct text nodes.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Builder form: set an attribute with no namespace.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name, value);
        self
    }

    /// Builder form: set an attribute in a specific namespace.
    pub fn with_attr_ns(
        mut self,
        ns: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attrs.insert_ns(ns, name, value);
        self
    }

    /// Builder form: append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Builder form: set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Remove an attribute with no namespace, returning its value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attrs.remove(name)
    }

    /// Copy of this element with attributes and text but no children.
    pub(crate) fn without_children(&self) -> Element {
        Element {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            attrs: self.attrs.clone(),
            children: Vec::new(),
            text: self.text.clone(),
        }
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = text;
    }
}

/// One-line summary used in diagnostics: tag plus attributes, children
/// and text elided.
impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (_, name, value) in self.attrs.iter() {
            write!(f, " {}=\"{}\"", name, value)?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_map_override_merge() {
        let parent = AttrMap::new().with("a", "1").with("b", "2");
        let child = AttrMap::new().with("b", "3").with("c", "4");

        let merged = parent.override_with(&child);
        assert_eq!(merged.get("a"), Some("1"));
        assert_eq!(merged.get("b"), Some("3"));
        assert_eq!(merged.get("c"), Some("4"));
        assert_eq!(merged.len(), 3);

        // Inputs are untouched
        assert_eq!(parent.get("b"), Some("2"));
        assert!(!parent.contains("c"));
    }

    #[test]
    fn test_attr_map_namespaced_keys_are_distinct() {
        let mut attrs = AttrMap::new();
        attrs.insert("lang", "plain");
        attrs.insert_ns(XML_NS, "lang", "namespaced");

        assert_eq!(attrs.get("lang"), Some("plain"));
        assert_eq!(attrs.get_ns(XML_NS, "lang"), Some("namespaced"));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_attr_map_remove() {
        let mut attrs = AttrMap::new().with("main", "bin/run");
        assert_eq!(attrs.remove("main"), Some("bin/run".to_string()));
        assert_eq!(attrs.remove("main"), None);
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_element_builders_and_accessors() {
        let elem = Element::in_namespace("urn:example", "group")
            .with_attr("stability", "stable")
            .with_child(Element::in_namespace("urn:example", "implementation"))
            .with_text("  hello  ");

        assert_eq!(elem.name(), "group");
        assert_eq!(elem.namespace(), Some("urn:example"));
        assert!(elem.is("urn:example", "group"));
        assert!(!elem.is("urn:example", "implementation"));
        assert_eq!(elem.attr("stability"), Some("stable"));
        assert_eq!(elem.children().len(), 1);
        assert_eq!(elem.text(), "  hello  ");
    }

    #[test]
    fn test_element_without_children() {
        let elem = Element::new("outer")
            .with_attr("keep", "yes")
            .with_child(Element::new("inner"));

        let shallow = elem.without_children();
        assert_eq!(shallow.attr("keep"), Some("yes"));
        assert!(shallow.children().is_empty());
        assert_eq!(elem.children().len(), 1);
    }

    #[test]
    fn test_element_display_summary() {
        let elem = Element::new("implementation")
            .with_attr("version", "1.0")
            .with_attr("id", "sha256=abc");

        // Attributes render in sorted order regardless of insertion order
        assert_eq!(
            elem.to_string(),
            "<implementation id=\"sha256=abc\" version=\"1.0\">"
        );
    }
}
