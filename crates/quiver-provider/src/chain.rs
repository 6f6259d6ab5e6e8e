//! The provider's `(prev_hash, seq)` pair (spec §3, §4.3 step 4, §5):
//! protected by a single mutex held across the whole receipt-building
//! critical section (read `(prev_hash, seq)`, increment `seq`, build and
//! canonicalize the receipt, store the new `prev_hash`), guaranteeing a
//! total order across concurrent streams (spec property 7). Receipt
//! construction is pure CPU work (§5), so the section never awaits and a
//! plain blocking mutex is the right tool, matching the spec's "held only
//! for this step" framing more directly than an async mutex would.

use std::sync::Mutex;

use quiver_core::error::Result;
use quiver_core::receipt::Receipt;

pub struct ChainState {
    inner: Mutex<Inner>,
}

struct Inner {
    prev_hash: String,
    seq: u64,
}

impl ChainState {
    pub fn new() -> Self {
        ChainState {
            inner: Mutex::new(Inner {
                prev_hash: String::new(),
                seq: 0,
            }),
        }
    }

    /// Build the next receipt in this provider's chain. `build` receives
    /// `(seq, prev_hash)` and must return a fully-populated `Receipt`; the
    /// new chain-link hash is derived from that receipt before the lock is
    /// released, so no other caller can observe a gap.
    pub fn next<F>(&self, build: F) -> Result<Receipt>
    where
        F: FnOnce(u64, String) -> Result<Receipt>,
    {
        let mut guard = self.inner.lock().expect("chain state mutex poisoned");
        guard.seq += 1;
        let seq = guard.seq;
        let prev_hash = guard.prev_hash.clone();

        let receipt = build(seq, prev_hash)?;
        guard.prev_hash = receipt.chained_hash()?;

        Ok(receipt)
    }
}

impl Default for ChainState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quiver_core::receipt::{Canary, RateInfo, ReceiptFields};

    fn build_receipt(seq: u64, prev_hash: String) -> Result<Receipt> {
        let now = Utc::now();
        Receipt::new(ReceiptFields {
            provider_pk: "pk".to_string(),
            model: "m".to_string(),
            prompt_hash: "a".repeat(64),
            output_hash: "b".repeat(64),
            tokens_in: 1,
            tokens_out: 1,
            start: now,
            end: now,
            seq,
            prev_hash,
            canary: Canary::default(),
            rate: RateInfo::default(),
        })
    }

    #[test]
    fn sequence_strictly_increases_and_chains() {
        let chain = ChainState::new();
        let r1 = chain.next(build_receipt).unwrap();
        assert_eq!(r1.seq, 1);
        assert_eq!(r1.prev_hash, "");

        let r2 = chain.next(build_receipt).unwrap();
        assert_eq!(r2.seq, 2);
        assert_eq!(r2.prev_hash, r1.chained_hash().unwrap());
        assert!(r2.seq > r1.seq);
    }
}
