// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn rotation_shifts_generations() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("maestrod.log");

    // Oversized current log plus two existing generations.
    std::fs::write(&log, vec![b'x'; (MAX_LOG_SIZE + 1) as usize]).unwrap();
    std::fs::write(dir.path().join("maestrod.log.1"), b"gen1").unwrap();
    std::fs::write(dir.path().join("maestrod.log.2"), b"gen2").unwrap();

    rotate_log_if_needed(&log);

    assert!(!log.exists());
    let gen1 = std::fs::read(dir.path().join("maestrod.log.1")).unwrap();
    assert_eq!(gen1.len(), (MAX_LOG_SIZE + 1) as usize);
    assert_eq!(
        std::fs::read(dir.path().join("maestrod.log.2")).unwrap(),
        b"gen1"
    );
    assert_eq!(
        std::fs::read(dir.path().join("maestrod.log.3")).unwrap(),
        b"gen2"
    );
}

#[test]
fn small_log_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("maestrod.log");
    std::fs::write(&log, b"tiny").unwrap();
    rotate_log_if_needed(&log);
    assert!(log.exists());
}

#[test]
fn rotation_ignores_missing_log() {
    let dir = tempfile::tempdir().unwrap();
    rotate_log_if_needed(&dir.path().join("absent.log"));
}

#[test]
fn startup_marker_appends_with_pid() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("logs").join("maestrod.log");

    write_startup_marker(&log).unwrap();
    write_startup_marker(&log).unwrap();

    let contents = std::fs::read_to_string(&log).unwrap();
    assert_eq!(contents.matches(STARTUP_MARKER_PREFIX).count(), 2);
    assert!(contents.contains(&std::process::id().to_string()));
}
