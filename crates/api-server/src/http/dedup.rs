//! Short-TTL deduplication of rapid-fire identical questions.
//!
//! This collapses accidental double submissions (a double-click, a nervous
//! retry) into one agent round-trip. It is not a semantic cache: entries
//! expire after a few seconds and the store is bounded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use shared::config::DedupConfig;

/// Stable digest of the normalized message text: trimmed, lower-cased,
/// inner whitespace collapsed so reformatted copies of the same question
/// hash identically.
pub(super) fn message_hash(message: &str) -> String {
    let normalized = message
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    format!("{:x}", Sha256::digest(normalized.as_bytes()))
}

#[derive(Clone)]
pub struct DedupStore {
    config: DedupConfig,
    entries: Arc<Mutex<HashMap<String, DedupRecord>>>,
}

#[derive(Debug, Clone)]
struct DedupRecord {
    stored_at: Instant,
    transcript: String,
}

impl DedupStore {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The cached transcript for this hash, if stored within the TTL.
    pub fn check(&self, hash: &str) -> Option<String> {
        self.check_at(hash, Instant::now())
    }

    pub fn store(&self, hash: String, transcript: String) {
        self.store_at(hash, transcript, Instant::now());
    }

    fn check_at(&self, hash: &str, now: Instant) -> Option<String> {
        let entries = self
            .entries
            .lock()
            .expect("dedup mutex should not be poisoned");
        let record = entries.get(hash)?;
        if now.saturating_duration_since(record.stored_at) >= self.ttl() {
            return None;
        }
        Some(record.transcript.clone())
    }

    fn store_at(&self, hash: String, transcript: String, now: Instant) {
        let mut entries = self
            .entries
            .lock()
            .expect("dedup mutex should not be poisoned");
        entries.insert(
            hash,
            DedupRecord {
                stored_at: now,
                transcript,
            },
        );

        if entries.len() > self.config.cleanup_threshold {
            let ttl = self.ttl();
            entries.retain(|_, record| now.saturating_duration_since(record.stored_at) < ttl);

            // TTL purge may not be enough under a burst of distinct
            // messages; drop the oldest entries down to the target size.
            if entries.len() > self.config.max_entries {
                let mut by_age: Vec<(String, Instant)> = entries
                    .iter()
                    .map(|(key, record)| (key.clone(), record.stored_at))
                    .collect();
                by_age.sort_by_key(|(_, stored_at)| *stored_at);
                for (key, _) in by_age
                    .into_iter()
                    .take(entries.len() - self.config.max_entries)
                {
                    entries.remove(&key);
                }
            }
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_millis(self.config.ttl_ms)
    }

    #[cfg(test)]
    fn stored_count(&self) -> usize {
        self.entries
            .lock()
            .expect("test mutex should not be poisoned")
            .len()
    }
}
