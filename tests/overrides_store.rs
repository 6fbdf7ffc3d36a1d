// tests/overrides_store.rs

//! The overrides store against a real directory.

use freshet::{FeedOverrides, OverridesStore, Stability};

const PROG: &str = "http://example.com/prog.xml";
const LIB: &str = "http://example.com/lib/feed.xml";

#[test]
fn test_overrides_survive_a_full_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = OverridesStore::new(dir.path().join("feeds"));

    let mut overrides = store.load(PROG).unwrap();
    assert_eq!(overrides, FeedOverrides::default(), "fresh store is empty");

    overrides
        .user_stability
        .insert("sha256new=AAA".to_string(), Stability::Preferred);
    overrides
        .user_stability
        .insert("sha256new=BBB".to_string(), Stability::Buggy);
    store.save(PROG, &overrides).unwrap();

    let reloaded = store.load(PROG).unwrap();
    assert_eq!(reloaded, overrides);

    let touched = store.touch(PROG).unwrap();
    assert!(touched.last_checked.is_some());
    assert_eq!(touched.user_stability, overrides.user_stability);
    assert_eq!(store.load(PROG).unwrap(), touched);
}

#[test]
fn test_feeds_do_not_collide_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = OverridesStore::new(dir.path().join("feeds"));

    let mut prog = FeedOverrides::default();
    prog.user_stability
        .insert("sha256new=AAA".to_string(), Stability::Preferred);
    let mut lib = FeedOverrides::default();
    lib.user_stability
        .insert("sha256new=LLL".to_string(), Stability::Developer);

    store.save(PROG, &prog).unwrap();
    store.save(LIB, &lib).unwrap();

    assert_eq!(store.load(PROG).unwrap(), prog);
    assert_eq!(store.load(LIB).unwrap(), lib);

    // Slashes never leak into the directory layout
    let names: Vec<String> = std::fs::read_dir(dir.path().join("feeds"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"http:##example.com#prog.xml".to_string()));
    assert!(names.contains(&"http:##example.com#lib#feed.xml".to_string()));
}
