// src/feed/groups.rs

//! Flattening of the grouping tree.
//!
//! Groups exist only in the document. Their attributes, dependencies,
//! bindings and commands are inherited by everything below them, inner
//! declarations overriding or extending outer ones, and compilation
//! emits the flat per-id implementation map.

use super::extract::{parse_command, parse_dependency};
use super::{
    BUILD_NS, FEED_NS, Implementations, ParseContext, feed_children, missing_attr, normalize_path,
};
use crate::arch::Arch;
use crate::digest::extract_digests;
use crate::error::{Error, Result};
use crate::model::{
    Binding, CacheImpl, Implementation, ImplementationType, PropertyScope, Stability,
};
use crate::retrieval::is_retrieval_method;
use crate::tree::Element;
use crate::version::Version;

/// Flatten the grouping tree below the feed root.
///
/// Returns the implementation map plus the package-implementation
/// templates, which stay element-shaped until a distribution scan
/// supplies their versions.
pub(crate) fn compile(
    root: &Element,
    seed: PropertyScope,
    ctx: &ParseContext<'_>,
) -> Result<(Implementations, Vec<(Element, PropertyScope)>)> {
    let mut implementations = Implementations::default();
    let mut packages = Vec::new();
    walk(root, &seed, ctx, &mut implementations, &mut packages)?;
    Ok((implementations, packages))
}

fn walk(
    parent: &Element,
    inherited: &PropertyScope,
    ctx: &ParseContext<'_>,
    implementations: &mut Implementations,
    packages: &mut Vec<(Element, PropertyScope)>,
) -> Result<()> {
    for item in feed_children(parent) {
        if !matches!(
            item.name(),
            "group" | "implementation" | "package-implementation"
        ) {
            continue;
        }
        let scope = merge_scope(inherited, item, ctx)?;
        match item.name() {
            "group" => walk(item, &scope, ctx, implementations, packages)?,
            "implementation" => {
                let implementation = finalize(item, scope, ctx)?;
                implementations.insert(implementation, item)?;
            }
            _ => packages.push((item.clone(), scope)),
        }
    }
    Ok(())
}

/// Merge an item's declarations over the inherited scope: attributes
/// override, dependencies and bindings append, commands insert or
/// replace by name.
///
/// Commands synthesized from the merged main, self-test and build
/// attributes are inserted before the item's explicit `<command>`
/// children are read, so an explicit declaration on the same item wins.
fn merge_scope(
    inherited: &PropertyScope,
    item: &Element,
    ctx: &ParseContext<'_>,
) -> Result<PropertyScope> {
    let mut scope = PropertyScope {
        attrs: inherited.attrs.override_with(item.attrs()),
        requires: inherited.requires.clone(),
        bindings: inherited.bindings.clone(),
        commands: inherited.commands.clone(),
    };

    let synthesized = [
        ("", "main", "run", "path"),
        ("", "self-test", "test", "path"),
        (BUILD_NS, "command", "compile", "shell-command"),
    ];
    for (ns, attr, command, carrier) in synthesized {
        let value = match scope.attrs.get_ns(ns, attr) {
            Some(value) => value,
            None => continue,
        };
        let node = Element::in_namespace(FEED_NS, "command")
            .with_attr("name", command)
            .with_attr(carrier, value);
        scope
            .commands
            .insert(command.to_string(), parse_command(&node, ctx)?);
    }

    for child in feed_children(item) {
        match child.name() {
            "requires" | "restricts" => {
                scope.requires.push(parse_dependency(child, ctx)?);
            }
            "command" => {
                let command = parse_command(child, ctx)?;
                scope.commands.insert(command.name.clone(), command);
            }
            name if Binding::is_binding_name(name) => {
                scope.bindings.push(Binding::new(child.clone()));
            }
            _ => {}
        }
    }

    Ok(scope)
}

/// Resolve an implementation node against its merged scope.
fn finalize(
    node: &Element,
    mut scope: PropertyScope,
    ctx: &ParseContext<'_>,
) -> Result<Implementation> {
    let id = node
        .attr("id")
        .ok_or_else(|| missing_attr("id", node))?
        .to_string();

    let Some(mut version_str) = scope.attrs.get("version").map(str::to_string) else {
        return Err(missing_attr("version", node));
    };
    if let Some(modifier) = scope.attrs.remove("version-modifier") {
        version_str.push_str(&modifier);
        scope.attrs.insert("version", version_str.as_str());
    }
    let version = Version::parse(&version_str).map_err(|e| e.at(node))?;

    let kind = match (ctx.local_dir, scope.attrs.get("local-path")) {
        (Some(dir), Some(path)) => ImplementationType::Local(normalize_path(&dir.join(path))),
        (None, Some(path)) => {
            return Err(Error::InvalidFeed(format!(
                "local-path '{path}' in remote feed {} (in {node})",
                ctx.url
            )));
        }
        (Some(dir), None) if id.starts_with('/') || id.starts_with('.') => {
            ImplementationType::Local(normalize_path(&dir.join(&id)))
        }
        _ => ImplementationType::Cache(CacheImpl {
            digests: extract_digests(node),
            retrieval_methods: node
                .children()
                .iter()
                .filter(|child| is_retrieval_method(child))
                .cloned()
                .collect(),
        }),
    };

    let (os, machine) = match scope.attrs.get("arch") {
        Some(value) => Arch::parse(value).map_err(|e| e.at(node))?.into_parts(),
        None => (None, None),
    };

    let stability = match scope.attrs.get("stability") {
        Some(value) => Stability::parse(value, false)?,
        None => Stability::Testing,
    };

    Ok(Implementation {
        id,
        props: scope,
        stability,
        os,
        machine,
        version,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Importance;
    use crate::tree::xml::parse_str;
    use std::path::Path;

    fn compile_remote(xml: &str) -> Result<(Implementations, Vec<(Element, PropertyScope)>)> {
        compile_with(xml, "http://example.com/prog.xml", None)
    }

    fn compile_local(xml: &str) -> Result<(Implementations, Vec<(Element, PropertyScope)>)> {
        compile_with(xml, "/srv/feeds/prog.xml", Some(Path::new("/srv/feeds")))
    }

    fn compile_with(
        xml: &str,
        url: &str,
        local_dir: Option<&Path>,
    ) -> Result<(Implementations, Vec<(Element, PropertyScope)>)> {
        let root = parse_str(xml).unwrap();
        let ctx = ParseContext { url, local_dir };
        let mut seed = PropertyScope::default();
        seed.attrs.insert("stability", "testing");
        seed.attrs.insert("from-feed", url);
        compile(&root, seed, &ctx)
    }

    fn feed(body: &str) -> String {
        format!(r#"<interface xmlns="{FEED_NS}">{body}</interface>"#)
    }

    // === Scope inheritance ===

    #[test]
    fn test_group_attribute_inheritance() {
        let (impls, _) = compile_remote(&feed(
            r#"<group version="1.0" arch="Linux-x86_64" stability="stable" license="MIT">
                 <implementation id="sha1=a"/>
                 <implementation id="sha1=b" stability="developer"/>
               </group>"#,
        ))
        .unwrap();

        let a = impls.get("sha1=a").unwrap();
        assert_eq!(a.version, Version::parse("1.0").unwrap());
        assert_eq!(a.os.as_deref(), Some("Linux"));
        assert_eq!(a.machine.as_deref(), Some("x86_64"));
        assert_eq!(a.stability, Stability::Stable);
        assert_eq!(a.attr("license"), Some("MIT"));
        assert_eq!(a.attr("from-feed"), Some("http://example.com/prog.xml"));

        let b = impls.get("sha1=b").unwrap();
        assert_eq!(b.stability, Stability::Developer);
        assert_eq!(b.version, a.version);
    }

    #[test]
    fn test_nested_groups_merge_depth_first() {
        let (impls, _) = compile_remote(&feed(
            r#"<group version="1.0" stability="stable">
                 <group arch="Linux-x86_64" stability="testing">
                   <implementation id="sha1=inner"/>
                 </group>
                 <implementation id="sha1=outer"/>
               </group>"#,
        ))
        .unwrap();

        let inner = impls.get("sha1=inner").unwrap();
        assert_eq!(inner.stability, Stability::Testing);
        assert_eq!(inner.os.as_deref(), Some("Linux"));

        let outer = impls.get("sha1=outer").unwrap();
        assert_eq!(outer.stability, Stability::Stable);
        assert_eq!(outer.os, None);
    }

    #[test]
    fn test_dependencies_and_bindings_accumulate() {
        let (impls, _) = compile_remote(&feed(
            r#"<group version="1.0">
                 <requires interface="http://e.com/one.xml"/>
                 <environment name="OUTER" insert="."/>
                 <implementation id="sha1=a">
                   <requires interface="http://e.com/two.xml"/>
                   <environment name="INNER" insert="lib"/>
                 </implementation>
               </group>"#,
        ))
        .unwrap();

        let imp = impls.get("sha1=a").unwrap();
        let interfaces: Vec<&str> = imp
            .props
            .requires
            .iter()
            .map(|dep| dep.interface.as_str())
            .collect();
        assert_eq!(interfaces, ["http://e.com/one.xml", "http://e.com/two.xml"]);

        let bindings: Vec<&str> = imp
            .props
            .bindings
            .iter()
            .map(|binding| binding.element().attr("name").unwrap_or(""))
            .collect();
        assert_eq!(bindings, ["OUTER", "INNER"]);
    }

    #[test]
    fn test_sibling_scopes_are_independent() {
        let (impls, _) = compile_remote(&feed(
            r#"<group version="1.0">
                 <implementation id="sha1=a">
                   <requires interface="http://e.com/only-a.xml"/>
                 </implementation>
                 <implementation id="sha1=b"/>
               </group>"#,
        ))
        .unwrap();

        assert_eq!(impls.get("sha1=a").unwrap().props.requires.len(), 1);
        assert!(impls.get("sha1=b").unwrap().props.requires.is_empty());
    }

    // === Commands ===

    #[test]
    fn test_commands_insert_or_replace() {
        let (impls, _) = compile_remote(&feed(
            r#"<group version="1.0">
                 <command name="run" path="bin/old"/>
                 <command name="test" path="bin/check"/>
                 <implementation id="sha1=a">
                   <command name="run" path="bin/new"/>
                 </implementation>
               </group>"#,
        ))
        .unwrap();

        let imp = impls.get("sha1=a").unwrap();
        assert_eq!(imp.command("run").unwrap().path.as_deref(), Some("bin/new"));
        assert_eq!(imp.command("test").unwrap().path.as_deref(), Some("bin/check"));
    }

    #[test]
    fn test_main_synthesizes_run_command() {
        let (impls, _) = compile_remote(&feed(
            r#"<group version="1.0" main="bin/prog">
                 <implementation id="sha1=plain"/>
                 <implementation id="sha1=explicit">
                   <command name="run" path="bin/other"/>
                 </implementation>
               </group>"#,
        ))
        .unwrap();

        // Inherited main synthesizes a run command
        let plain = impls.get("sha1=plain").unwrap();
        assert_eq!(plain.command("run").unwrap().path.as_deref(), Some("bin/prog"));

        // An explicit command on the same item beats the synthesized one
        let explicit = impls.get("sha1=explicit").unwrap();
        assert_eq!(
            explicit.command("run").unwrap().path.as_deref(),
            Some("bin/other")
        );
    }

    #[test]
    fn test_self_test_synthesizes_test_command() {
        let (impls, _) = compile_remote(&feed(
            r#"<implementation id="sha1=a" version="1.0" self-test="bin/selftest"/>"#,
        ))
        .unwrap();
        let imp = impls.get("sha1=a").unwrap();
        assert_eq!(
            imp.command("test").unwrap().path.as_deref(),
            Some("bin/selftest")
        );
    }

    #[test]
    fn test_build_attribute_synthesizes_compile_command() {
        let xml = format!(
            r#"<interface xmlns="{FEED_NS}" xmlns:build="{BUILD_NS}">
                 <implementation id="sha1=src" version="1.0" arch="*-src" build:command="make"/>
               </interface>"#
        );
        let (impls, _) = compile_remote(&xml).unwrap();
        let imp = impls.get("sha1=src").unwrap();
        let compile_cmd = imp.command("compile").unwrap();
        assert_eq!(compile_cmd.shell_command.as_deref(), Some("make"));
        assert_eq!(compile_cmd.path, None);
        assert_eq!(imp.machine.as_deref(), Some("src"));
    }

    // === Finalization ===

    #[test]
    fn test_version_modifier_appends() {
        let (impls, _) = compile_remote(&feed(
            r#"<group version="1.0">
                 <implementation id="sha1=a" version-modifier="-pre2"/>
               </group>"#,
        ))
        .unwrap();

        let imp = impls.get("sha1=a").unwrap();
        assert_eq!(imp.version, Version::parse("1.0-pre2").unwrap());
        assert_eq!(imp.attr("version"), Some("1.0-pre2"));
        assert_eq!(imp.attr("version-modifier"), None);
    }

    #[test]
    fn test_missing_id_and_version_rejected() {
        let err = compile_remote(&feed(r#"<implementation version="1.0"/>"#)).unwrap_err();
        assert!(matches!(err, Error::InvalidFeed(msg) if msg.contains("'id'")));

        let err = compile_remote(&feed(r#"<implementation id="sha1=a"/>"#)).unwrap_err();
        assert!(matches!(err, Error::InvalidFeed(msg) if msg.contains("'version'")));
    }

    #[test]
    fn test_malformed_version_names_the_node() {
        let err = compile_remote(&feed(
            r#"<implementation id="sha1=a" version="banana"/>"#,
        ))
        .unwrap_err();
        match err {
            Error::InvalidVersion { value, context, .. } => {
                assert_eq!(value, "banana");
                assert!(context.contains("sha1=a"), "context: {}", context);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = compile_remote(&feed(
            r#"<implementation id="sha1=same" version="1.0"/>
               <implementation id="sha1=same" version="2.0"/>"#,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateId { id, .. } if id == "sha1=same"));
    }

    #[test]
    fn test_user_only_stability_rejected() {
        let err = compile_remote(&feed(
            r#"<implementation id="sha1=a" version="1.0" stability="preferred"/>"#,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::UserOnlyStability(_)));
    }

    // === Implementation kinds ===

    #[test]
    fn test_cache_implementation_collects_digests_and_methods() {
        let (impls, _) = compile_remote(&feed(
            r#"<implementation id="sha1=abc" version="1.0">
                 <manifest-digest sha256new="XYZ"/>
                 <archive src="http://example.com/prog-1.0.tgz" size="100"/>
                 <unknown-extension/>
               </implementation>"#,
        ))
        .unwrap();

        let imp = impls.get("sha1=abc").unwrap();
        assert_eq!(imp.local_path(), None);
        let digests: Vec<String> = imp.digests().iter().map(|d| d.to_string()).collect();
        assert_eq!(digests, ["sha1=abc", "sha256new=XYZ"]);
        assert_eq!(imp.retrieval_methods().len(), 1);
        assert_eq!(imp.retrieval_methods()[0].name(), "archive");
    }

    #[test]
    fn test_local_path_resolution() {
        let (impls, _) = compile_local(&feed(
            r#"<implementation id="v1.0" version="1.0" local-path="builds/v1.0"/>
               <implementation id="./v2.0" version="2.0"/>
               <implementation id="/opt/prog" version="3.0"/>"#,
        ))
        .unwrap();

        assert_eq!(
            impls.get("v1.0").unwrap().local_path(),
            Some(Path::new("/srv/feeds/builds/v1.0"))
        );
        assert_eq!(
            impls.get("./v2.0").unwrap().local_path(),
            Some(Path::new("/srv/feeds/v2.0"))
        );
        assert_eq!(
            impls.get("/opt/prog").unwrap().local_path(),
            Some(Path::new("/opt/prog"))
        );
    }

    #[test]
    fn test_local_path_in_remote_feed_rejected() {
        let err = compile_remote(&feed(
            r#"<implementation id="sha1=a" version="1.0" local-path="builds/v1"/>"#,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidFeed(msg) if msg.contains("local-path")));
    }

    #[test]
    fn test_dotted_id_in_remote_feed_is_cached() {
        // Without a local directory a dotted id is just an id
        let (impls, _) = compile_remote(&feed(
            r#"<implementation id="./v1" version="1.0"/>"#,
        ))
        .unwrap();
        assert_eq!(impls.get("./v1").unwrap().local_path(), None);
    }

    // === Package implementations ===

    #[test]
    fn test_package_implementations_deferred() {
        let (impls, packages) = compile_remote(&feed(
            r#"<group stability="stable">
                 <requires interface="http://e.com/lib.xml"/>
                 <package-implementation package="prog" distributions="rpm deb"/>
               </group>"#,
        ))
        .unwrap();

        assert!(impls.is_empty());
        assert_eq!(packages.len(), 1);
        let (node, scope) = &packages[0];
        assert_eq!(node.name(), "package-implementation");
        assert_eq!(node.attr("package"), Some("prog"));
        assert_eq!(scope.attrs.get("package"), Some("prog"));
        assert_eq!(scope.attrs.get("stability"), Some("stable"));
        assert_eq!(scope.requires.len(), 1);
        assert_eq!(scope.requires[0].importance, Importance::Essential);
    }

    #[test]
    fn test_unknown_children_are_skipped() {
        let (impls, packages) = compile_remote(&feed(
            r#"<summary>not a group</summary>
               <homepage>http://example.com</homepage>
               <implementation id="sha1=a" version="1.0"/>"#,
        ))
        .unwrap();
        assert_eq!(impls.len(), 1);
        assert!(packages.is_empty());
    }
}
