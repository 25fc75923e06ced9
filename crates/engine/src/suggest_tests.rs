// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn edit_distance_identical() {
    assert_eq!(edit_distance("acme/opus-4", "acme/opus-4"), 0);
}

#[test]
fn edit_distance_substitution_insertion_deletion() {
    assert_eq!(edit_distance("sonnet", "sonnex"), 1);
    assert_eq!(edit_distance("sonnet", "sonnets"), 1);
    assert_eq!(edit_distance("sonnet", "sonne"), 1);
}

#[test]
fn edit_distance_empty_strings() {
    assert_eq!(edit_distance("", ""), 0);
    assert_eq!(edit_distance("abc", ""), 3);
    assert_eq!(edit_distance("", "abc"), 3);
}

#[test]
fn nearest_returns_closest_first() {
    let candidates = vec![
        "acme/opus-4".to_string(),
        "acme/sonnet-4".to_string(),
        "zephyr/z-mini".to_string(),
    ];
    let result = nearest("acme/sonet-4", &candidates, 3);
    assert_eq!(result[0], "acme/sonnet-4");
    assert_eq!(result.len(), 3);
}

#[test]
fn nearest_respects_limit() {
    let candidates = vec![
        "a".to_string(),
        "b".to_string(),
        "c".to_string(),
        "d".to_string(),
    ];
    assert_eq!(nearest("a", &candidates, 3).len(), 3);
}

#[test]
fn nearest_is_deterministic_on_ties() {
    let candidates = vec!["ab".to_string(), "ba".to_string()];
    // Both are distance 1 from "aa"; candidate order wins.
    assert_eq!(nearest("aa", &candidates, 2), vec!["ab", "ba"]);
}

#[test]
fn format_suggestion_single() {
    let similar = vec!["acme/sonnet-4".to_string()];
    assert_eq!(
        format_suggestion(&similar),
        "\n\n  did you mean: acme/sonnet-4?"
    );
}

#[test]
fn format_suggestion_multiple() {
    let similar = vec!["a/x".to_string(), "a/y".to_string()];
    assert_eq!(
        format_suggestion(&similar),
        "\n\n  did you mean one of: a/x, a/y?"
    );
}

#[test]
fn format_suggestion_empty() {
    assert_eq!(format_suggestion(&[]), "");
}
