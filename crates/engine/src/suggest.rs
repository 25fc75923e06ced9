// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! "Did you mean?" suggestion helpers for lookup failures.

/// Levenshtein edit distance between two strings.
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}

/// The `limit` candidates nearest to `input` by edit distance, closest
/// first. Ties keep candidate order, so results are deterministic for a
/// given candidate list.
pub(crate) fn nearest(input: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let mut scored: Vec<(usize, &String)> = candidates
        .iter()
        .map(|c| (edit_distance(input, c), c))
        .collect();
    scored.sort_by_key(|(d, _)| *d);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, c)| c.clone())
        .collect()
}

/// Format a "did you mean" hint for appending to an error message.
/// Returns empty string if no suggestions.
pub(crate) fn format_suggestion(similar: &[String]) -> String {
    match similar.len() {
        0 => String::new(),
        1 => format!("\n\n  did you mean: {}?", similar[0]),
        _ => format!("\n\n  did you mean one of: {}?", similar.join(", ")),
    }
}

#[cfg(test)]
#[path = "suggest_tests.rs"]
mod tests;
