// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;
use tempfile::tempdir;

const SID: &str = "11111111-2222-4333-8444-555555555555";
const SID2: &str = "22222222-2222-4333-8444-555555555555";

fn write_transcript(dir: &Path, sid: &str, cwd: Option<&str>) {
    std::fs::create_dir_all(dir).unwrap();
    let mut lines = Vec::new();
    if let Some(cwd) = cwd {
        lines.push(
            serde_json::json!({"type": "user", "uuid": "u1", "cwd": cwd, "message": {}})
                .to_string(),
        );
    }
    lines.push(serde_json::json!({"type": "assistant", "uuid": "u2", "message": {}}).to_string());
    std::fs::write(dir.join(format!("{sid}.jsonl")), lines.join("\n") + "\n").unwrap();
}

#[test]
fn preload_learns_from_cwd_lines() {
    let root = tempdir().unwrap();
    write_transcript(&root.path().join("-home-alice-app"), SID, Some("/home/alice/app"));
    write_transcript(&root.path().join("-home-bob-tool"), SID2, Some("/home/bob/tool"));

    let map = PathMap::new(root.path());
    assert_eq!(map.preload(), 2);
    assert_eq!(map.resolve(Path::new("/home/alice/app")).as_deref(), Some("-home-alice-app"));
    assert_eq!(map.resolve(Path::new("/home/bob/tool")).as_deref(), Some("-home-bob-tool"));
}

#[test]
fn preload_ignores_directories_without_cwd() {
    let root = tempdir().unwrap();
    write_transcript(&root.path().join("-home-alice-app"), SID, None);

    let map = PathMap::new(root.path());
    assert_eq!(map.preload(), 0);
    assert!(map.resolve(Path::new("/home/alice/app")).is_none());
}

#[test]
fn refresh_finds_exact_cwd_match() {
    let root = tempdir().unwrap();
    write_transcript(&root.path().join("-home-alice-app"), SID, Some("/home/alice/app"));

    let map = PathMap::new(root.path());
    assert_eq!(map.refresh(Path::new("/home/alice/app")).as_deref(), Some("-home-alice-app"));
    // Now cached
    assert_eq!(map.resolve(Path::new("/home/alice/app")).as_deref(), Some("-home-alice-app"));
}

#[test]
fn refresh_learns_non_ascii_mapping_via_cwd() {
    let root = tempdir().unwrap();
    // Encoded name lost the non-ASCII segment; the cwd line is authoritative.
    write_transcript(&root.path().join("-home-alice---"), SID, Some("/home/alice/日記"));

    let map = PathMap::new(root.path());
    assert_eq!(map.refresh(Path::new("/home/alice/日記")).as_deref(), Some("-home-alice---"));
}

#[test]
fn refresh_skips_directories_outside_ascii_prefix() {
    let root = tempdir().unwrap();
    // Same store, unrelated project; its transcript would match nothing.
    write_transcript(&root.path().join("-srv-data"), SID, Some("/srv/data"));

    let map = PathMap::new(root.path());
    assert!(map.refresh(Path::new("/home/alice/app")).is_none());
}

#[test]
fn refresh_falls_back_to_fresh_basename_directory() {
    let root = tempdir().unwrap();
    // Directory just created by the assistant: no usable cwd line yet.
    let dir = root.path().join("-home-alice-app");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{SID}.jsonl")), "").unwrap();

    let map = PathMap::new(root.path());
    assert_eq!(map.refresh(Path::new("/home/alice/app")).as_deref(), Some("-home-alice-app"));
}

#[test]
fn refresh_evicts_vanished_entries() {
    let root = tempdir().unwrap();
    let map = PathMap::new(root.path());
    map.learn("/home/alice/app", "-home-alice-gone");

    assert!(map.refresh(Path::new("/home/alice/app")).is_none());
    assert!(map.resolve(Path::new("/home/alice/app")).is_none());
}

#[test]
fn synthesize_creates_directory_and_caches() {
    let root = tempdir().unwrap();
    let map = PathMap::new(root.path());

    let encoded = map.synthesize(Path::new("/home/alice/fresh")).unwrap();
    assert_eq!(encoded, "-home-alice-fresh");
    assert!(root.path().join("-home-alice-fresh").is_dir());
    assert_eq!(map.resolve(Path::new("/home/alice/fresh")), Some(encoded));
}

#[test]
fn cached_hit_skips_scan() {
    let root = tempdir().unwrap();
    let dir = root.path().join("-home-alice-app");
    std::fs::create_dir_all(&dir).unwrap();

    let map = PathMap::new(root.path());
    map.learn("/home/alice/app", "-home-alice-app");
    assert_eq!(
        map.resolve_or_refresh(Path::new("/home/alice/app")).as_deref(),
        Some("-home-alice-app")
    );
}
