// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! String-backed identifier types.
//!
//! Everything in the orchestrator is addressed by an opaque string id:
//! profiles, tasks, runtime sessions. [`string_id!`] stamps out one
//! newtype per id kind so they cannot be mixed up in signatures while
//! staying cheap to build from config and wire values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Define a string newtype id.
///
/// The generated type carries the usual map-key derives and converts
/// freely from borrowed and owned strings:
///
/// ```ignore
/// string_id! {
///     /// Stable identifier a worker profile is addressed by.
///     pub struct ProfileId;
/// }
///
/// let id = ProfileId::new("coder");
/// assert_eq!(id.as_str(), "coder");
/// assert_eq!(id.short(4), "code");
/// ```
#[macro_export]
macro_rules! string_id {
    ($(#[$attr:meta])* pub struct $id:ident;) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $id(String);

        impl $id {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Prefix of at most `n` characters, for display columns.
            pub fn short(&self, n: usize) -> &str {
                match self.0.char_indices().nth(n) {
                    Some((cut, _)) => &self.0[..cut],
                    None => &self.0,
                }
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $id {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $id {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $id {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $id {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        // Lets a `HashMap<$id, _>` be queried with a plain `&str`.
        impl std::borrow::Borrow<str> for $id {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $id {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $id {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

/// Source of fresh identifiers.
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// Random v4 UUIDs, for production.
#[derive(Clone, Copy, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Predictable `prefix-N` ids, for tests. Clones share one counter.
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
