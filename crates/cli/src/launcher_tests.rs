// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { r#"{"type":"uuid","value":"9f8d2c1e-0000-4000-8000-000000000001"}"#, Some("9f8d2c1e-0000-4000-8000-000000000001") },
    padded = { "  {\"type\":\"uuid\",\"value\":\"abc\"}  ", Some("abc") },
    wrong_type = { r#"{"type":"log","value":"x"}"#, None },
    missing_value = { r#"{"type":"uuid"}"#, None },
    not_json = { "not json", None },
)]
fn uuid_line_parsing(line: &str, expected: Option<&str>) {
    assert_eq!(parse_uuid_line(line).as_deref(), expected);
}

#[tokio::test]
async fn fifo_reader_forwards_uuid_lines() {
    let fifo = create_uuid_fifo().unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    tokio::spawn(pump_uuid_pipe(fifo.clone(), tx, cancel.clone()));

    // Writer side opens, writes one line, closes — as the launcher does.
    let fifo_for_writer = fifo.clone();
    tokio::task::spawn_blocking(move || {
        use std::io::Write;
        let mut writer = std::fs::OpenOptions::new().write(true).open(fifo_for_writer).unwrap();
        writeln!(writer, r#"{{"type":"uuid","value":"A"}}"#).unwrap();
    })
    .await
    .unwrap();

    let uuid = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(uuid, "A");

    cancel.cancel();
    let _ = std::fs::remove_file(fifo);
}

#[tokio::test]
async fn spawn_with_resume_passes_session_flag() {
    // Use a shell that records its arguments.
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("args.txt");
    let launcher = Launcher::new(vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("echo \"$0 $@\" > {}", out.display()),
    ]);

    let sid = SessionId::new("9f8d2c1e-0000-4000-8000-000000000001");
    let mut running = launcher.spawn(dir.path(), Some(&sid)).unwrap();
    running.child.wait().await.unwrap();

    let recorded = std::fs::read_to_string(&out).unwrap();
    assert!(recorded.contains("--resume"));
    assert!(recorded.contains(sid.as_str()));
    assert!(running.uuid_rx.is_none());
}

#[tokio::test]
async fn spawn_fresh_session_exports_pipe_env() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("env.txt");
    let launcher = Launcher::new(vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("echo \"$VLAUDE_UUID_PIPE\" > {}", out.display()),
    ]);

    let mut running = launcher.spawn(dir.path(), None).unwrap();
    running.child.wait().await.unwrap();

    let pipe_path = std::fs::read_to_string(&out).unwrap().trim().to_string();
    assert!(!pipe_path.is_empty());
    assert!(running.uuid_rx.is_some());
    drop(running);
    // The FIFO is cleaned up on drop.
    assert!(!std::path::Path::new(&pipe_path).exists());
}
