// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-profile spawn lock.
//!
//! One lock file per profile id under the runtime's lock directory,
//! held with an OS advisory lock (fs2). The OS releases advisory locks
//! when their holder dies, so a crashed orchestrator never wedges a
//! profile; the pid metadata written into the file is for diagnostics
//! and stale-holder reporting only.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Poll interval while waiting for a contended lock.
const ACQUIRE_POLL: Duration = Duration::from_millis(50);

/// Metadata older than this with a dead holder pid is reported stale.
pub const STALE_LOCK_GRACE: Duration = Duration::from_secs(600);

/// Errors from lock acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("timed out waiting for lock on profile '{profile}' after {waited:?}")]
    Timeout { profile: String, waited: Duration },
    #[error("lock I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Holder metadata written into the lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockMeta {
    pid: u32,
    acquired_at_ms: u64,
}

/// A held profile lock. Released on drop.
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// File-backed advisory lock keyed by profile id.
pub struct ProfileLock;

impl ProfileLock {
    /// Acquire the lock for `profile`, waiting up to `timeout`.
    pub async fn acquire(
        dir: &Path,
        profile: &str,
        timeout: Duration,
    ) -> Result<LockGuard, LockError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.lock", profile));
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Fully qualified: std::fs::File has grown its own lock
            // methods, which would otherwise be ambiguous with fs2's.
            match fs2::FileExt::try_lock_exclusive(&file) {
                Ok(()) => break,
                Err(_) => {
                    report_stale_holder(&mut file, profile);
                    if tokio::time::Instant::now() >= deadline {
                        return Err(LockError::Timeout {
                            profile: profile.to_string(),
                            waited: timeout,
                        });
                    }
                    tokio::time::sleep(ACQUIRE_POLL).await;
                }
            }
        }

        write_meta(&mut file)?;
        Ok(LockGuard { file, path })
    }

    /// Run `f` while holding the lock for `profile`.
    pub async fn with_lock<T, F, Fut>(
        dir: &Path,
        profile: &str,
        timeout: Duration,
        f: F,
    ) -> Result<T, LockError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let guard = Self::acquire(dir, profile, timeout).await?;
        let result = f().await;
        drop(guard);
        Ok(result)
    }
}

fn write_meta(file: &mut File) -> Result<(), std::io::Error> {
    let meta = LockMeta {
        pid: std::process::id(),
        acquired_at_ms: std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0),
    };
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serde_json::to_string(&meta).unwrap_or_default().as_bytes())?;
    file.flush()
}

/// Log when the recorded holder looks dead and the metadata is old.
///
/// The advisory lock itself cannot be stale (the OS drops it with the
/// holder), so this only fires for a live process that wrote metadata
/// long ago or a pid namespace mismatch. Either deserves a warning.
fn report_stale_holder(file: &mut File, profile: &str) {
    let mut raw = String::new();
    if file.seek(SeekFrom::Start(0)).is_err() || file.read_to_string(&mut raw).is_err() {
        return;
    }
    let Ok(meta) = serde_json::from_str::<LockMeta>(&raw) else {
        return;
    };
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let age = Duration::from_millis(now_ms.saturating_sub(meta.acquired_at_ms));
    if age > STALE_LOCK_GRACE && !pid_alive(meta.pid) {
        tracing::warn!(
            profile,
            holder_pid = meta.pid,
            age_secs = age.as_secs(),
            "reclaimed stale lock metadata from dead holder"
        );
    }
}

#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
