// src/tree/xml.rs

//! XML front end for the element tree.
//!
//! Reads namespace-resolved documents via quick-xml's `NsReader`.
//! Comments, processing instructions and doctype declarations carry no
//! model content and are skipped; text is accumulated per element and
//! trimmed once the element closes.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::{Error, Result};
use crate::tree::Element;

/// Parse a complete XML document into an element tree.
pub fn parse_str(xml: &str) -> Result<Element> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<(Element, String)> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolution, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(start) => {
                let ns = namespace_of(resolution)?;
                let elem = open_element(&reader, ns, &start)?;
                stack.push((elem, String::new()));
            }
            Event::Empty(start) => {
                let ns = namespace_of(resolution)?;
                let elem = open_element(&reader, ns, &start)?;
                attach(elem, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                // The reader has already checked that the name matches
                let (mut elem, text) = stack
                    .pop()
                    .ok_or_else(|| Error::InvalidDocument("unmatched end tag".to_string()))?;
                elem.set_text(text.trim().to_string());
                attach(elem, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                if let Some((_, text)) = stack.last_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::InvalidDocument(
            "unexpected end of document".to_string(),
        ));
    }
    root.ok_or_else(|| Error::InvalidDocument("no root element".to_string()))
}

/// Read a document from disk and parse it.
pub fn parse_file(path: &Path) -> Result<Element> {
    let xml = fs::read_to_string(path)?;
    parse_str(&xml)
}

fn namespace_of(resolution: ResolveResult<'_>) -> Result<Option<String>> {
    match resolution {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(String::from_utf8_lossy(ns).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::InvalidDocument(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    ns: Option<String>,
    start: &BytesStart<'_>,
) -> Result<Element> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut elem = match ns {
        Some(ns) => Element::in_namespace(ns, name),
        None => Element::new(name),
    };

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let value = attr.unescape_value()?.into_owned();
        let (resolution, local) = reader.resolve_attribute(attr.key);
        let local = String::from_utf8_lossy(local.as_ref()).into_owned();
        match resolution {
            ResolveResult::Bound(Namespace(ns)) => {
                let ns = String::from_utf8_lossy(ns).into_owned();
                elem.attrs.insert_ns(ns, local, value);
            }
            ResolveResult::Unbound => elem.attrs.insert(local, value),
            ResolveResult::Unknown(prefix) => {
                return Err(Error::InvalidDocument(format!(
                    "undeclared namespace prefix '{}' on attribute '{}'",
                    String::from_utf8_lossy(&prefix),
                    local
                )));
            }
        }
    }
    Ok(elem)
}

fn attach(
    elem: Element,
    stack: &mut Vec<(Element, String)>,
    root: &mut Option<Element>,
) -> Result<()> {
    match stack.last_mut() {
        Some((parent, _)) => parent.push_child(elem),
        None => {
            if root.is_some() {
                return Err(Error::InvalidDocument("multiple root elements".to_string()));
            }
            *root = Some(elem);
        }
    }
    Ok(())
}
