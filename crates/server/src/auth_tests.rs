// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;
use yare::parameterized;

#[parameterized(
    loopback_v4 = { "127.0.0.0/8", "127.0.0.1", true },
    loopback_v4_edge = { "127.0.0.0/8", "127.255.255.254", true },
    outside_v4 = { "127.0.0.0/8", "128.0.0.1", false },
    exact_host = { "10.1.2.3", "10.1.2.3", true },
    exact_host_miss = { "10.1.2.3", "10.1.2.4", false },
    subnet = { "192.168.1.0/24", "192.168.1.77", true },
    subnet_miss = { "192.168.1.0/24", "192.168.2.77", false },
    loopback_v6 = { "::1/128", "::1", true },
    v6_vs_v4 = { "::1/128", "127.0.0.1", false },
)]
fn trusted_net_matching(net: &str, ip: &str, expected: bool) {
    let net = TrustedNet::parse(net).unwrap();
    assert_eq!(net.contains(ip.parse().unwrap()), expected);
}

#[parameterized(
    garbage = { "not-a-net" },
    bad_prefix = { "127.0.0.1/99" },
    empty = { "" },
)]
fn bad_cidrs_are_rejected(s: &str) {
    assert!(matches!(TrustedNet::parse(s), Err(AuthError::BadCidr(_))));
}

#[test]
fn trusted_peer_bypasses_token() {
    let auth = Auth::new(None, None, &["127.0.0.0/8".to_string()]).unwrap();
    let subject = auth.authenticate("127.0.0.1".parse().unwrap(), None).unwrap();
    assert!(subject.trusted);
    assert!(subject.subject.is_none());
}

#[test]
fn external_peer_without_token_is_rejected() {
    let auth = Auth::new(None, None, &["127.0.0.0/8".to_string()]).unwrap();
    let err = auth.authenticate("203.0.113.9".parse().unwrap(), None).unwrap_err();
    assert!(matches!(err, AuthError::MissingToken));
}

#[test]
fn external_peer_with_token_but_no_key_is_rejected() {
    let auth = Auth::new(None, None, &[]).unwrap();
    let err = auth.authenticate("203.0.113.9".parse().unwrap(), Some("x.y.z")).unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[test]
fn issue_without_signing_key_fails() {
    let auth = Auth::new(None, None, &[]).unwrap();
    assert!(matches!(auth.issue("mobile-1", 0), Err(AuthError::NoSigningKey)));
}

#[test]
fn auth_error_display_is_opaque() {
    // Clients see the same message for missing and invalid tokens.
    assert_eq!(AuthError::MissingToken.to_string(), AuthError::InvalidToken.to_string());
}
