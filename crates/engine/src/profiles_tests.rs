// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn overlay(model: Option<&str>) -> ProfileOverlay {
    ProfileOverlay {
        model: model.map(str::to_string),
        ..Default::default()
    }
}

#[test]
fn builtins_cover_the_stock_profiles() {
    let set = ProfileSet::resolve(&HashMap::new(), &HashMap::new());
    for id in ["coder", "vision", "docs", "general"] {
        assert!(set.get(id).is_ok(), "missing builtin {}", id);
    }
}

#[test]
fn vision_builtin_supports_vision() {
    let set = ProfileSet::resolve(&HashMap::new(), &HashMap::new());
    let vision = set.get("vision").unwrap();
    assert!(vision.capabilities.supports_vision);
    assert_eq!(vision.model, "auto:vision");
}

#[test]
fn global_overlay_overrides_model() {
    let globals = HashMap::from([("coder".to_string(), overlay(Some("acme/opus-4")))]);
    let set = ProfileSet::resolve(&globals, &HashMap::new());
    assert_eq!(set.get("coder").unwrap().model, "acme/opus-4");
}

#[test]
fn project_overlay_wins_over_global() {
    let globals = HashMap::from([("coder".to_string(), overlay(Some("acme/opus-4")))]);
    let projects = HashMap::from([("coder".to_string(), overlay(Some("acme/haiku-4")))]);
    let set = ProfileSet::resolve(&globals, &projects);
    assert_eq!(set.get("coder").unwrap().model, "acme/haiku-4");
}

#[test]
fn absent_overlay_fields_keep_lower_layer() {
    let globals = HashMap::from([("coder".to_string(), overlay(Some("acme/opus-4")))]);
    let set = ProfileSet::resolve(&globals, &HashMap::new());
    let coder = set.get("coder").unwrap();
    // Builtin purpose survives a model-only overlay.
    assert_eq!(coder.purpose, "Writes and edits code");
    assert!(coder.capabilities.inject_repo_context);
}

#[test]
fn tags_are_replaced_not_concatenated() {
    let globals = HashMap::from([(
        "coder".to_string(),
        ProfileOverlay {
            tags: Some(vec!["fast".to_string()]),
            ..Default::default()
        },
    )]);
    let set = ProfileSet::resolve(&globals, &HashMap::new());
    assert_eq!(set.get("coder").unwrap().tags, vec!["fast"]);
}

#[test]
fn tool_settings_normalize_to_booleans() {
    let mut tools = IndexMap::new();
    tools.insert("web.fetch".to_string(), ToolSetting::Enabled(true));
    tools.insert(
        "shell.exec".to_string(),
        ToolSetting::Detailed { enabled: false },
    );
    let globals = HashMap::from([(
        "coder".to_string(),
        ProfileOverlay {
            tools,
            ..Default::default()
        },
    )]);
    let set = ProfileSet::resolve(&globals, &HashMap::new());
    let coder = set.get("coder").unwrap();
    assert_eq!(coder.tools.get("web.fetch"), Some(&true));
    assert_eq!(coder.tools.get("shell.exec"), Some(&false));
}

#[test]
fn tools_merge_by_key_across_layers() {
    let globals = HashMap::from([(
        "coder".to_string(),
        ProfileOverlay {
            tools: IndexMap::from([("a".to_string(), ToolSetting::Enabled(true))]),
            ..Default::default()
        },
    )]);
    let projects = HashMap::from([(
        "coder".to_string(),
        ProfileOverlay {
            tools: IndexMap::from([("b".to_string(), ToolSetting::Enabled(true))]),
            ..Default::default()
        },
    )]);
    let set = ProfileSet::resolve(&globals, &projects);
    let coder = set.get("coder").unwrap();
    assert_eq!(coder.tools.get("a"), Some(&true));
    assert_eq!(coder.tools.get("b"), Some(&true));
}

#[test]
fn overlay_can_define_new_profile() {
    let globals = HashMap::from([(
        "reviewer".to_string(),
        ProfileOverlay {
            purpose: Some("Reviews diffs".to_string()),
            model: Some("auto:fast".to_string()),
            ..Default::default()
        },
    )]);
    let set = ProfileSet::resolve(&globals, &HashMap::new());
    let reviewer = set.get("reviewer").unwrap();
    assert_eq!(reviewer.purpose, "Reviews diffs");
    assert_eq!(reviewer.model, "auto:fast");
    assert_eq!(reviewer.kind, WorkerKind::Server);
}

#[test]
fn unknown_profile_suggests_nearest() {
    let set = ProfileSet::resolve(&HashMap::new(), &HashMap::new());
    let err = set.get("codr").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConfigInvalid);
    assert!(err.hint.unwrap_or_default().contains("coder"));
}

#[test]
fn toml_overlay_parses_mixed_tool_values() {
    let overlay: ProfileOverlay = toml::from_str(
        r#"
        model = "acme/opus-4"
        supports_vision = true

        [tools]
        "web.fetch" = true
        "shell.exec" = { enabled = false }
        "#,
    )
    .unwrap();
    assert_eq!(overlay.model.as_deref(), Some("acme/opus-4"));
    assert_eq!(overlay.supports_vision, Some(true));
    assert_eq!(
        overlay.tools.get("web.fetch"),
        Some(&ToolSetting::Enabled(true))
    );
    assert_eq!(
        overlay.tools.get("shell.exec"),
        Some(&ToolSetting::Detailed { enabled: false })
    );
}
