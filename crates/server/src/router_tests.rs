// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;

fn sid() -> SessionId {
    SessionId::new("s1")
}

#[test]
fn first_and_last_edges() {
    let router = SubscriptionRouter::new();
    assert!(router.subscribe(&sid(), Path::new("/p"), &ClientId::new("a")));
    assert!(!router.subscribe(&sid(), Path::new("/p"), &ClientId::new("b")));

    assert!(!router.unsubscribe(&sid(), &ClientId::new("a")));
    assert!(router.unsubscribe(&sid(), &ClientId::new("b")));
    assert!(router.subscribers(&sid()).is_empty());
}

#[test]
fn duplicate_subscribe_does_not_double_count() {
    let router = SubscriptionRouter::new();
    assert!(router.subscribe(&sid(), Path::new("/p"), &ClientId::new("a")));
    assert!(!router.subscribe(&sid(), Path::new("/p"), &ClientId::new("a")));
    assert_eq!(router.subscribers(&sid()).len(), 1);
    assert!(router.unsubscribe(&sid(), &ClientId::new("a")));
}

#[test]
fn unsubscribe_unknown_is_noop() {
    let router = SubscriptionRouter::new();
    assert!(!router.unsubscribe(&sid(), &ClientId::new("ghost")));
}

#[test]
fn unsubscribe_all_reports_released_sessions() {
    let router = SubscriptionRouter::new();
    router.subscribe(&SessionId::new("s1"), Path::new("/p"), &ClientId::new("a"));
    router.subscribe(&SessionId::new("s2"), Path::new("/q"), &ClientId::new("a"));
    router.subscribe(&SessionId::new("s2"), Path::new("/q"), &ClientId::new("b"));

    let mut released = router.unsubscribe_all(&ClientId::new("a"));
    released.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));
    assert_eq!(released, vec![(SessionId::new("s1"), PathBuf::from("/p"))]);
    assert_eq!(router.subscribers(&SessionId::new("s2")).len(), 1);
}

#[test]
fn most_recent_tracks_resubscription() {
    let router = SubscriptionRouter::new();
    router.subscribe(&sid(), Path::new("/p"), &ClientId::new("a"));
    router.subscribe(&sid(), Path::new("/p"), &ClientId::new("b"));
    assert_eq!(router.most_recent(&sid()), Some(ClientId::new("b")));

    router.subscribe(&sid(), Path::new("/p"), &ClientId::new("a"));
    assert_eq!(router.most_recent(&sid()), Some(ClientId::new("a")));
}

#[test]
fn real_path_is_remembered() {
    let router = SubscriptionRouter::new();
    router.subscribe(&sid(), Path::new("/p"), &ClientId::new("a"));
    assert_eq!(router.real_path_of(&sid()), Some(PathBuf::from("/p")));
}
