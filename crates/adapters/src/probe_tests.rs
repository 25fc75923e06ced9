// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn process(pid: u32, profile: Option<&str>) -> RuntimeProcess {
    let args = match profile {
        Some(p) => vec![
            "opencode-runtime".to_string(),
            "serve".to_string(),
            "--profile".to_string(),
            p.to_string(),
        ],
        None => vec!["opencode-runtime".to_string(), "serve".to_string()],
    };
    RuntimeProcess {
        pid,
        rss_bytes: 1024,
        profile_id: profile.map(str::to_string),
        args,
    }
}

#[test]
fn parse_profile_arg_finds_value() {
    let args = vec![
        "opencode-runtime".to_string(),
        "serve".to_string(),
        "--port".to_string(),
        "40001".to_string(),
        "--profile".to_string(),
        "docs".to_string(),
    ];
    assert_eq!(parse_profile_arg(&args), Some("docs".to_string()));
}

#[test]
fn parse_profile_arg_missing() {
    let args = vec!["opencode-runtime".to_string(), "serve".to_string()];
    assert_eq!(parse_profile_arg(&args), None);
}

#[test]
fn parse_profile_arg_trailing_flag() {
    let args = vec!["opencode-runtime".to_string(), "--profile".to_string()];
    assert_eq!(parse_profile_arg(&args), None);
}

#[test]
fn no_duplicates_for_distinct_profiles() {
    let processes = vec![process(1, Some("coder")), process(2, Some("docs"))];
    assert!(find_duplicates_in(&processes).is_empty());
}

#[test]
fn duplicate_profile_is_reported_with_both_pids() {
    let processes = vec![
        process(1, Some("docs")),
        process(2, Some("docs")),
        process(3, Some("coder")),
    ];
    let duplicates = find_duplicates_in(&processes);
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].0, "docs");
    assert_eq!(duplicates[0].1, vec![1, 2]);
}

#[test]
fn profileless_processes_are_ignored() {
    let processes = vec![process(1, None), process(2, None)];
    assert!(find_duplicates_in(&processes).is_empty());
}

#[test]
fn scan_does_not_panic() {
    // Smoke test against the live host; the runtime binary will not be
    // present on CI, so the result is usually empty.
    let probe = ProcessProbe::new("opencode-runtime");
    let _ = probe.scan();
}
