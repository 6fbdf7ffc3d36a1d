// src/feed/extract.rs

//! Compilation of dependency and command declarations.
//!
//! These appear in three places: directly under groups and
//! implementations, inside `<command>` elements, and synthesized from
//! legacy attributes. The same functions serve all of them.

use std::collections::BTreeSet;

use super::{ParseContext, feed_children, missing_attr, normalize_path};
use crate::error::{Error, Result};
use crate::model::{Binding, Command, Dependency, Importance};
use crate::restriction::Restriction;
use crate::tree::Element;
use crate::version::Version;

/// Compile a requires, restricts or runner element.
pub(crate) fn parse_dependency(node: &Element, ctx: &ParseContext<'_>) -> Result<Dependency> {
    let interface = node
        .attr("interface")
        .ok_or_else(|| missing_attr("interface", node))?;
    let interface = resolve_interface(interface, ctx, node)?;

    let mut restrictions = Vec::new();
    let mut required_commands = BTreeSet::new();

    for child in feed_children(node) {
        match child.name() {
            "version" => {
                let not_before = child
                    .attr("not-before")
                    .map(Version::parse)
                    .transpose()
                    .map_err(|e| e.at(child))?;
                let before = child
                    .attr("before")
                    .map(Version::parse)
                    .transpose()
                    .map_err(|e| e.at(child))?;
                restrictions.push(Restriction::range(not_before, before));
            }
            name if Binding::is_binding_name(name) => {
                if let Some(command) = Binding::command_of(child) {
                    required_commands.insert(command.to_string());
                }
            }
            _ => {}
        }
    }

    // A runner executes its target, so it always needs a command of it.
    if node.name() == "runner" {
        required_commands.insert(node.attr("command").unwrap_or("run").to_string());
    }

    if let Some(expr) = node.attr("version") {
        restrictions.insert(0, Restriction::expression(expr));
    }
    if let Some(distros) = node.attr("distribution") {
        restrictions.push(Restriction::distribution(distros));
    }

    let importance = if node.name() == "restricts" {
        Importance::Restricts
    } else {
        match node.attr("importance") {
            None | Some("essential") => Importance::Essential,
            Some(_) => Importance::Recommended,
        }
    };

    Ok(Dependency {
        interface,
        importance,
        restrictions,
        required_commands,
        os: node.attr("os").map(str::to_string),
        use_filter: node.attr("use").map(str::to_string),
    })
}

/// Compile a command element, explicit or synthesized.
pub(crate) fn parse_command(node: &Element, ctx: &ParseContext<'_>) -> Result<Command> {
    let name = match node.attr("name") {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(missing_attr("name", node)),
    };

    let mut requires = Vec::new();
    let mut bindings = Vec::new();
    let mut runner_seen = false;
    for child in feed_children(node) {
        match child.name() {
            "requires" | "restricts" => requires.push(parse_dependency(child, ctx)?),
            "runner" => {
                if runner_seen {
                    return Err(Error::InvalidFeed(format!(
                        "more than one <runner> in {node}"
                    )));
                }
                runner_seen = true;
                requires.push(parse_dependency(child, ctx)?);
            }
            name if Binding::is_binding_name(name) => {
                bindings.push(Binding::new(child.clone()));
            }
            _ => {}
        }
    }

    Ok(Command {
        name,
        path: node.attr("path").map(str::to_string),
        shell_command: node.attr("shell-command").map(str::to_string),
        requires,
        bindings,
        element: node.clone(),
    })
}

/// Resolve a dependency's interface reference. References starting with
/// '.' are paths relative to the local feed's directory and illegal
/// elsewhere; everything else is taken as written.
fn resolve_interface(value: &str, ctx: &ParseContext<'_>, node: &Element) -> Result<String> {
    if !value.starts_with('.') {
        return Ok(value.to_string());
    }
    match ctx.local_dir {
        Some(dir) => Ok(normalize_path(&dir.join(value)).display().to_string()),
        None => Err(Error::InvalidFeed(format!(
            "relative interface '{value}' in remote feed {} (in {node})",
            ctx.url
        ))),
    }
}
