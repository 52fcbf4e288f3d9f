// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;

fn sid() -> SessionId {
    SessionId::new("s1")
}

fn register(hub: &Hub, id: &str) -> mpsc::Receiver<ServerFrame> {
    let (tx, rx) = mpsc::channel(16);
    hub.register(ClientId::new(id), None, false, tx);
    rx
}

#[test]
fn mobile_join_notifies_occupying_cli() {
    let hub = Hub::new();
    let mut cli_rx = register(&hub, "cli");
    let _mobile_rx = register(&hub, "m1");

    hub.join(&ClientId::new("cli"), &sid(), ClientType::Cli, &"/p".into());
    assert!(cli_rx.try_recv().is_err());

    let outcome = hub.join(&ClientId::new("m1"), &sid(), ClientType::Mobile, &"/p".into());
    assert_eq!(outcome, JoinOutcome::MobileJoined { cli_notified: Some(ClientId::new("cli")) });
    assert!(matches!(cli_rx.try_recv(), Ok(ServerFrame::RemoteConnect { .. })));
}

#[test]
fn cli_join_sees_existing_mobiles() {
    let hub = Hub::new();
    let _mobile_rx = register(&hub, "m1");
    let mut cli_rx = register(&hub, "cli");

    hub.join(&ClientId::new("m1"), &sid(), ClientType::Mobile, &"/p".into());
    let outcome = hub.join(&ClientId::new("cli"), &sid(), ClientType::Cli, &"/p".into());
    assert_eq!(outcome, JoinOutcome::CliJoined { mobiles_present: true, replaced: None });
    assert!(matches!(cli_rx.try_recv(), Ok(ServerFrame::RemoteConnect { .. })));
}

#[test]
fn mobile_rejoin_re_emits_remote_connect() {
    let hub = Hub::new();
    let mut cli_rx = register(&hub, "cli");
    let _mobile_rx = register(&hub, "m1");

    hub.join(&ClientId::new("cli"), &sid(), ClientType::Cli, &"/p".into());
    hub.join(&ClientId::new("m1"), &sid(), ClientType::Mobile, &"/p".into());
    hub.join(&ClientId::new("m1"), &sid(), ClientType::Mobile, &"/p".into());

    assert!(matches!(cli_rx.try_recv(), Ok(ServerFrame::RemoteConnect { .. })));
    assert!(matches!(cli_rx.try_recv(), Ok(ServerFrame::RemoteConnect { .. })));
}

#[test]
fn second_cli_replaces_first() {
    let hub = Hub::new();
    let _a = register(&hub, "cli-a");
    let _b = register(&hub, "cli-b");

    hub.join(&ClientId::new("cli-a"), &sid(), ClientType::Cli, &"/p".into());
    let outcome = hub.join(&ClientId::new("cli-b"), &sid(), ClientType::Cli, &"/p".into());
    assert_eq!(
        outcome,
        JoinOutcome::CliJoined { mobiles_present: false, replaced: Some(ClientId::new("cli-a")) }
    );
    assert_eq!(hub.cli_of(&sid()), Some(ClientId::new("cli-b")));
}

#[test]
fn last_mobile_leave_releases_cli() {
    let hub = Hub::new();
    let mut cli_rx = register(&hub, "cli");
    let _m1 = register(&hub, "m1");
    let _m2 = register(&hub, "m2");

    hub.join(&ClientId::new("cli"), &sid(), ClientType::Cli, &"/p".into());
    hub.join(&ClientId::new("m1"), &sid(), ClientType::Mobile, &"/p".into());
    hub.join(&ClientId::new("m2"), &sid(), ClientType::Mobile, &"/p".into());
    // Drain the two remote-connect notifications.
    while cli_rx.try_recv().is_ok() {}

    let outcome = hub.leave(&ClientId::new("m1"), &sid());
    assert_eq!(outcome.cli_released, None);
    assert!(cli_rx.try_recv().is_err());

    let outcome = hub.leave(&ClientId::new("m2"), &sid());
    assert_eq!(outcome.cli_released, Some(ClientId::new("cli")));
    assert!(matches!(cli_rx.try_recv(), Ok(ServerFrame::RemoteDisconnect)));
}

#[test]
fn empty_occupancy_record_is_removed() {
    let hub = Hub::new();
    let _m1 = register(&hub, "m1");
    hub.join(&ClientId::new("m1"), &sid(), ClientType::Mobile, &"/p".into());
    assert!(hub.has_occupancy(&sid()));
    hub.leave(&ClientId::new("m1"), &sid());
    assert!(!hub.has_occupancy(&sid()));
}

#[test]
fn disconnect_releases_like_leave() {
    let hub = Hub::new();
    let mut cli_rx = register(&hub, "cli");
    let _m1 = register(&hub, "m1");

    hub.join(&ClientId::new("cli"), &sid(), ClientType::Cli, &"/p".into());
    hub.join(&ClientId::new("m1"), &sid(), ClientType::Mobile, &"/p".into());
    while cli_rx.try_recv().is_ok() {}

    let outcome = hub.disconnect(&ClientId::new("m1"));
    assert_eq!(outcome.cli_released, Some(ClientId::new("cli")));
    assert!(!hub.is_connected(&ClientId::new("m1")));
    assert!(matches!(cli_rx.try_recv(), Ok(ServerFrame::RemoteDisconnect)));
}

#[test]
fn last_mobile_tracks_recency() {
    let hub = Hub::new();
    let _m1 = register(&hub, "m1");
    let _m2 = register(&hub, "m2");

    hub.join(&ClientId::new("m1"), &sid(), ClientType::Mobile, &"/p".into());
    hub.join(&ClientId::new("m2"), &sid(), ClientType::Mobile, &"/p".into());
    assert_eq!(hub.last_mobile_of(&sid()), Some(ClientId::new("m2")));

    // m1 re-joins and becomes the most recent again.
    hub.join(&ClientId::new("m1"), &sid(), ClientType::Mobile, &"/p".into());
    assert_eq!(hub.last_mobile_of(&sid()), Some(ClientId::new("m1")));
}

#[test]
fn send_to_unknown_client_is_false() {
    let hub = Hub::new();
    assert!(!hub.send(&ClientId::new("ghost"), ServerFrame::RemoteDisconnect));
}
