//! Epoch lifecycle (spec §3 "Epoch", §4.4 step 4): created lazily on first
//! reference, mutated only by `finalize`, never re-finalized with a
//! different root. Grounded on the teacher's `AppState`-holds-shared-state
//! pattern, with a `std::sync::RwLock<HashMap<..>>` in place of the
//! teacher's `PgPool` since the aggregator is in-memory by design
//! (spec.md non-goals).

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;

const SECONDS_PER_EPOCH: i64 = 86_400;

#[derive(Debug, Clone, Serialize)]
pub struct EpochInfo {
    pub epoch: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub root: String,
    pub receipt_count: usize,
    pub finalized: bool,
}

impl EpochInfo {
    fn new(epoch: u64) -> Self {
        let start_time = Utc.timestamp_opt((epoch as i64) * SECONDS_PER_EPOCH, 0).unwrap();
        let end_time = start_time + chrono::Duration::seconds(SECONDS_PER_EPOCH);
        EpochInfo {
            epoch,
            start_time,
            end_time,
            root: String::new(),
            receipt_count: 0,
            finalized: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EpochError {
    #[error("epoch_conflict: epoch {0} was already finalized with a different root")]
    Conflict(u64),
}

pub struct EpochManager {
    epochs: RwLock<HashMap<u64, EpochInfo>>,
}

impl EpochManager {
    pub fn new() -> Self {
        EpochManager {
            epochs: RwLock::new(HashMap::new()),
        }
    }

    pub fn current_epoch() -> u64 {
        (Utc::now().timestamp() / SECONDS_PER_EPOCH) as u64
    }

    pub fn get(&self, epoch: u64) -> Option<EpochInfo> {
        self.epochs.read().unwrap().get(&epoch).cloned()
    }

    pub fn count(&self) -> usize {
        self.epochs.read().unwrap().len()
    }

    /// Finalize `epoch` with `root`/`receipt_count`. Idempotent when the
    /// root matches an already-finalized epoch; rejects a differing root
    /// (spec §4.4 step 4, property 10, scenario S4).
    pub fn finalize(&self, epoch: u64, root: String, receipt_count: usize) -> Result<(), EpochError> {
        let mut guard = self.epochs.write().unwrap();
        let info = guard.entry(epoch).or_insert_with(|| EpochInfo::new(epoch));

        if info.finalized && info.root != root {
            return Err(EpochError::Conflict(epoch));
        }

        info.root = root;
        info.receipt_count = receipt_count;
        info.finalized = true;
        Ok(())
    }
}

impl Default for EpochManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazily_created_and_finalized() {
        let manager = EpochManager::new();
        assert!(manager.get(19723).is_none());

        manager.finalize(19723, "root1".to_string(), 2).unwrap();
        let info = manager.get(19723).unwrap();
        assert!(info.finalized);
        assert_eq!(info.root, "root1");
    }

    #[test]
    fn idempotent_same_root() {
        let manager = EpochManager::new();
        manager.finalize(1, "root1".to_string(), 2).unwrap();
        manager.finalize(1, "root1".to_string(), 2).unwrap();
        assert_eq!(manager.get(1).unwrap().receipt_count, 2);
    }

    #[test]
    fn conflict_on_different_root() {
        let manager = EpochManager::new();
        manager.finalize(1, "root1".to_string(), 2).unwrap();
        let err = manager.finalize(1, "root2".to_string(), 3).unwrap_err();
        assert!(matches!(err, EpochError::Conflict(1)));
    }
}
