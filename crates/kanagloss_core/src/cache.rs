//! Token → translation memo with per-entry expiry.
//!
//! Expiry is checked on read; nothing sweeps the map in the background. The
//! cache is not tied to a session and survives every reset.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    translation: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationCache {
    entries: HashMap<String, CacheEntry>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a translation. An expired entry is evicted and reported absent.
    pub fn get(&mut self, token: &str, now: Instant) -> Option<String> {
        let entry = self.entries.get(token)?;
        if entry.expires_at <= now {
            self.entries.remove(token);
            return None;
        }
        Some(entry.translation.clone())
    }

    /// Store `translation` until `now + ttl`. Blank translations are ignored.
    pub fn set(&mut self, token: &str, translation: &str, ttl: Duration, now: Instant) {
        let translation = translation.trim();
        if translation.is_empty() {
            return;
        }
        self.entries.insert(
            token.to_string(),
            CacheEntry {
                translation: translation.to_string(),
                expires_at: now + ttl,
            },
        );
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
