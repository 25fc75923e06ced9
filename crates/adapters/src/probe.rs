// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local process probe.
//!
//! Enumerates agent-runtime processes on this host for diagnostics and
//! leak detection: pid, resident memory, and the owning profile parsed
//! from the command line. The pool is the source of truth for what
//! *should* be running; the probe reports what *is*.

use std::collections::HashMap;
use sysinfo::{ProcessRefreshKind, RefreshKind, System};

/// A runtime process observed on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeProcess {
    pub pid: u32,
    pub rss_bytes: u64,
    /// Profile the process serves, parsed from `--profile <id>`.
    pub profile_id: Option<String>,
    pub args: Vec<String>,
}

/// Extract the `--profile <id>` value from a command line.
pub(crate) fn parse_profile_arg(args: &[String]) -> Option<String> {
    args.iter()
        .position(|a| a == "--profile")
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// Scans the host for agent-runtime processes.
#[derive(Debug, Clone)]
pub struct ProcessProbe {
    runtime_binary: String,
}

impl ProcessProbe {
    pub fn new(runtime_binary: impl Into<String>) -> Self {
        Self {
            runtime_binary: runtime_binary.into(),
        }
    }

    /// All processes whose executable name matches the runtime binary.
    pub fn scan(&self) -> Vec<RuntimeProcess> {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_processes(ProcessRefreshKind::everything()),
        );
        let needle = binary_stem(&self.runtime_binary);

        let mut found: Vec<RuntimeProcess> = system
            .processes()
            .iter()
            .filter(|(_, process)| {
                process.name().to_string_lossy().contains(needle.as_str())
            })
            .map(|(pid, process)| {
                let args: Vec<String> = process
                    .cmd()
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect();
                RuntimeProcess {
                    pid: pid.as_u32(),
                    rss_bytes: process.memory(),
                    profile_id: parse_profile_arg(&args),
                    args,
                }
            })
            .collect();
        found.sort_by_key(|p| p.pid);
        found
    }

    /// Profiles served by more than one live process.
    ///
    /// A duplicate means a spawn raced past the profile lock or a stop
    /// left an orphan behind; either way it is a leak worth surfacing.
    pub fn find_duplicates(&self) -> Vec<(String, Vec<u32>)> {
        find_duplicates_in(&self.scan())
    }
}

/// Group processes by profile and keep the profiles with multiple pids.
pub(crate) fn find_duplicates_in(processes: &[RuntimeProcess]) -> Vec<(String, Vec<u32>)> {
    let mut by_profile: HashMap<&str, Vec<u32>> = HashMap::new();
    for process in processes {
        if let Some(profile) = process.profile_id.as_deref() {
            by_profile.entry(profile).or_default().push(process.pid);
        }
    }
    let mut duplicates: Vec<(String, Vec<u32>)> = by_profile
        .into_iter()
        .filter(|(_, pids)| pids.len() > 1)
        .map(|(profile, pids)| (profile.to_string(), pids))
        .collect();
    duplicates.sort();
    duplicates
}

/// Last path component of a binary reference, for name matching.
fn binary_stem(binary: &str) -> String {
    std::path::Path::new(binary)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| binary.to_string())
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
