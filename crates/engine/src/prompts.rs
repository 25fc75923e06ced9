// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt store: loads system prompt files, cached by content hash.
//!
//! Profiles hold a [`PromptRef`] rather than inline text. Repeated loads
//! of an unchanged file are served from cache; an edited file re-caches
//! under its new hash.

use maestro_core::PromptRef;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Caches prompt text by sha256 of the file contents.
#[derive(Clone, Default)]
pub struct PromptStore {
    /// hash -> text
    by_hash: Arc<Mutex<HashMap<String, Arc<String>>>>,
    /// path -> hash of the last observed contents
    by_path: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl PromptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a prompt file, returning cached text when the contents are
    /// unchanged.
    pub fn load(&self, prompt: &PromptRef) -> io::Result<Arc<String>> {
        let bytes = std::fs::read(&prompt.path)?;
        let hash = content_hash(&bytes);

        if let Some(text) = self.by_hash.lock().get(&hash) {
            self.by_path
                .lock()
                .insert(prompt.path.clone(), hash.clone());
            return Ok(Arc::clone(text));
        }

        let text = String::from_utf8(bytes).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("prompt {} is not utf-8: {}", prompt.path.display(), e),
            )
        })?;
        let text = Arc::new(text);
        self.by_hash.lock().insert(hash.clone(), Arc::clone(&text));
        self.by_path.lock().insert(prompt.path.clone(), hash);
        Ok(text)
    }

    /// Number of distinct prompt texts cached.
    pub fn cached_count(&self) -> usize {
        self.by_hash.lock().len()
    }
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
