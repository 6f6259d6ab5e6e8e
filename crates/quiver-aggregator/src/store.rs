//! The in-memory aggregator store (spec §3 "Aggregator store"): signed
//! receipts by id, receipts by epoch, and inclusion proofs by id, all
//! guarded by a single reader-writer lock (spec §5 "Shared resources").
//! Grounded on the teacher's `AppState` pattern, with
//! `Arc<RwLock<StoreInner>>` standing in for the teacher's `PgPool` since
//! persistence beyond process lifetime is an explicit non-goal.

use std::collections::HashMap;
use std::sync::RwLock;

use quiver_core::receipt::SignedReceipt;

#[derive(Default)]
struct StoreInner {
    receipts: HashMap<String, SignedReceipt>,
    receipts_by_epoch: HashMap<u64, Vec<String>>,
    proofs: HashMap<String, Vec<String>>,
}

pub struct Store {
    inner: RwLock<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Store {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Upsert a receipt by id (spec §4.4 step 1).
    pub fn upsert(&self, epoch: u64, signed: SignedReceipt) {
        let id = signed.receipt.receipt_id.clone();
        let mut guard = self.inner.write().unwrap();
        if !guard.receipts.contains_key(&id) {
            guard.receipts_by_epoch.entry(epoch).or_default().push(id.clone());
        }
        guard.receipts.insert(id, signed);
    }

    pub fn get(&self, receipt_id: &str) -> Option<SignedReceipt> {
        self.inner.read().unwrap().receipts.get(receipt_id).cloned()
    }

    /// All receipts currently stored for `epoch`, sorted by `seq` ascending
    /// with `receipt_id` lexicographic tie-break (spec §4.4 step 2). This
    /// ordering only affects `/state`'s view; the Merkle tree re-sorts
    /// leaves by hash regardless.
    pub fn epoch_receipts(&self, epoch: u64) -> Vec<SignedReceipt> {
        let guard = self.inner.read().unwrap();
        let mut receipts: Vec<SignedReceipt> = guard
            .receipts_by_epoch
            .get(&epoch)
            .into_iter()
            .flatten()
            .filter_map(|id| guard.receipts.get(id).cloned())
            .collect();
        receipts.sort_by(|a, b| {
            a.receipt
                .seq
                .cmp(&b.receipt.seq)
                .then_with(|| a.receipt.receipt_id.cmp(&b.receipt.receipt_id))
        });
        receipts
    }

    pub fn store_proof(&self, receipt_id: &str, proof: Vec<String>) {
        self.inner
            .write()
            .unwrap()
            .proofs
            .insert(receipt_id.to_string(), proof);
    }

    pub fn get_proof(&self, receipt_id: &str) -> Option<Vec<String>> {
        self.inner.read().unwrap().proofs.get(receipt_id).cloned()
    }

    /// Read-only export of the full store for `/state` (spec §4.4
    /// `/state`).
    pub fn export_state(&self) -> ExportedState {
        let guard = self.inner.read().unwrap();
        ExportedState {
            receipts: guard.receipts.clone(),
            proofs: guard.proofs.clone(),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(serde::Serialize)]
pub struct ExportedState {
    pub receipts: HashMap<String, SignedReceipt>,
    pub proofs: HashMap<String, Vec<String>>,
}
