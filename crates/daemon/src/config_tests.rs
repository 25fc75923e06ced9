// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_file_yields_defaults() {
    let settings = Settings::load(Path::new("/definitely/not/here.toml")).unwrap();
    assert_eq!(settings.runtime.binary, "opencode-runtime");
    assert_eq!(settings.bridge.port, 0);
    assert_eq!(settings.limits.system_context_max_workers, 8);
    assert!(settings.profiles.is_empty());
}

#[test]
fn full_settings_file_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("maestro.toml");
    std::fs::write(
        &path,
        r#"
        [runtime]
        binary = "opencode-runtime"
        url = "http://127.0.0.1:5000"
        spawn_timeout_secs = 10

        [bridge]
        port = 7777
        request_timeout_ms = 5000

        [limits]
        system_context_max_workers = 4

        [profiles.coder]
        model = "acme/opus-4"

        [profiles.coder.tools]
        "web.fetch" = true

        [pinned_ports]
        docs = 40123

        [[workflows]]
        id = "review"
        steps = [
            { worker = "coder", task = "implement: {input}" },
            { worker = "docs", task = "document: {previous}" },
        ]
        "#,
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.runtime.url, "http://127.0.0.1:5000");
    assert_eq!(settings.bridge.port, 7777);
    assert_eq!(settings.limits.system_context_max_workers, 4);
    // Unset limit fields keep their defaults.
    assert_eq!(settings.limits.max_tool_input_bytes, 64 * 1024);
    assert_eq!(
        settings.profiles["coder"].model.as_deref(),
        Some("acme/opus-4")
    );
    assert_eq!(settings.pinned_ports["docs"], 40123);
    assert_eq!(settings.workflows.len(), 1);
    assert_eq!(settings.workflows[0].steps.len(), 2);
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("maestro.toml");
    std::fs::write(&path, "[runtime\nbinary=").unwrap();
    match Settings::load(&path) {
        Err(SettingsError::Parse { path: p, .. }) => assert!(p.contains("maestro.toml")),
        other => panic!("expected parse error, got {:?}", other.map(|_| ())),
    }
}
