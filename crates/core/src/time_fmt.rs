// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compact elapsed-time rendering for list views.

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Render a millisecond duration the way the status tables show it.
///
/// Sub-second values keep millisecond precision (task turnarounds are
/// often below a second); anything longer collapses to the largest one
/// or two units: `"450ms"`, `"5s"`, `"2m"`, `"1h30m"`, `"3d"`.
pub fn format_elapsed_ms(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{}ms", ms);
    }
    format_elapsed(ms / 1_000)
}

/// Render whole seconds; see [`format_elapsed_ms`] for the shape.
pub fn format_elapsed(secs: u64) -> String {
    match secs {
        s if s < MINUTE => format!("{}s", s),
        s if s < HOUR => format!("{}m", s / MINUTE),
        s if s < DAY => match (s / HOUR, (s % HOUR) / MINUTE) {
            (hours, 0) => format!("{}h", hours),
            (hours, minutes) => format!("{}h{}m", hours, minutes),
        },
        s => format!("{}d", s / DAY),
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
