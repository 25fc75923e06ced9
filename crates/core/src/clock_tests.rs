// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.epoch_ms();
    let b = clock.epoch_ms();
    assert!(b >= a);
    // Sanity: after 2020.
    assert!(a > 1_577_836_800_000);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new(1_000);
    assert_eq!(clock.epoch_ms(), 1_000);
    clock.advance(500);
    assert_eq!(clock.epoch_ms(), 1_500);
}

#[test]
fn fake_clock_set_is_absolute() {
    let clock = FakeClock::new(1_000);
    clock.set(9_999);
    assert_eq!(clock.epoch_ms(), 9_999);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new(0);
    let clone = clock.clone();
    clock.advance(100);
    assert_eq!(clone.epoch_ms(), 100);
}
