// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn skill_rule_exact_match() {
    let rule = SkillRule {
        pattern: "git.commit".to_string(),
        policy: SkillPolicy::Ask,
    };
    assert!(rule.matches("git.commit"));
    assert!(!rule.matches("git.push"));
}

#[test]
fn skill_rule_glob_match() {
    let rule = SkillRule {
        pattern: "git.*".to_string(),
        policy: SkillPolicy::Allow,
    };
    assert!(rule.matches("git.commit"));
    assert!(rule.matches("git.push"));
    assert!(!rule.matches("web.fetch"));
}

#[test]
fn skill_policy_first_match_wins() {
    let perms = Permissions {
        skills: vec![
            SkillRule {
                pattern: "git.push".to_string(),
                policy: SkillPolicy::Deny,
            },
            SkillRule {
                pattern: "git.*".to_string(),
                policy: SkillPolicy::Allow,
            },
        ],
        ..Default::default()
    };
    assert_eq!(perms.skill_policy("git.push"), SkillPolicy::Deny);
    assert_eq!(perms.skill_policy("git.commit"), SkillPolicy::Allow);
}

#[test]
fn skill_policy_defaults_to_ask() {
    let perms = Permissions::default();
    assert_eq!(perms.skill_policy("anything"), SkillPolicy::Ask);
}

#[parameterized(
    no_vision_needed = { false, false, true },
    vision_satisfied = { true, true, true },
    vision_missing = { true, false, false },
)]
fn profile_satisfies_vision(needs_vision: bool, supports: bool, expected: bool) {
    let mut profile = crate::test_support::profile_fixture("coder");
    profile.capabilities.supports_vision = supports;
    assert_eq!(profile.satisfies(needs_vision), expected);
}

#[test]
fn permissions_serde_snake_case() {
    let perms = Permissions {
        filesystem: FsAccess::Full,
        execution: ExecAccess::None,
        network: NetAccess::Localhost,
        ..Default::default()
    };
    let json = serde_json::to_value(&perms).unwrap();
    assert_eq!(json["filesystem"], "full");
    assert_eq!(json["execution"], "none");
    assert_eq!(json["network"], "localhost");
}

#[test]
fn worker_kind_serde() {
    assert_eq!(
        serde_json::to_value(WorkerKind::Server).unwrap(),
        serde_json::json!("server")
    );
    assert_eq!(
        serde_json::to_value(WorkerKind::Subagent).unwrap(),
        serde_json::json!("subagent")
    );
}
