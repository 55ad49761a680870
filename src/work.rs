use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blake2::{Blake2s256, Digest};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::types::BlockHash;

/// Minimum hash value a nonce must reach over its root. Kept low enough that
/// generation finishes in a few hundred attempts on average.
pub const WORK_THRESHOLD: u64 = 0xff00_0000_0000_0000;

/// Proof-of-work generator with per-root cancellation.
pub struct WorkPool {
    threshold: u64,
    cancellations: Mutex<HashMap<BlockHash, Arc<AtomicBool>>>,
}

impl WorkPool {
    pub fn new() -> Self {
        Self::with_threshold(WORK_THRESHOLD)
    }

    pub fn with_threshold(threshold: u64) -> Self {
        Self {
            threshold,
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    pub fn validate(&self, root: &BlockHash, work: u64) -> bool {
        work_value(root, work) >= self.threshold
    }

    /// Searches for a valid nonce for `root`. Blocks the calling thread;
    /// returns `None` if [`cancel`](Self::cancel) fires for the root first.
    pub fn generate(&self, root: &BlockHash) -> Option<u64> {
        let flag = Arc::new(AtomicBool::new(false));
        self.cancellations.lock().insert(*root, flag.clone());
        let mut work = OsRng.next_u64();
        let result = loop {
            if flag.load(Ordering::Relaxed) {
                break None;
            }
            if work_value(root, work) >= self.threshold {
                break Some(work);
            }
            work = work.wrapping_add(1);
        };
        let mut cancellations = self.cancellations.lock();
        if let Some(current) = cancellations.get(root) {
            if Arc::ptr_eq(current, &flag) {
                cancellations.remove(root);
            }
        }
        result
    }

    /// Cancels any generation outstanding for `root`.
    pub fn cancel(&self, root: &BlockHash) {
        if let Some(flag) = self.cancellations.lock().get(root) {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

impl Default for WorkPool {
    fn default() -> Self {
        Self::new()
    }
}

fn work_value(root: &BlockHash, work: u64) -> u64 {
    let mut hasher = Blake2s256::new();
    hasher.update(work.to_le_bytes());
    hasher.update(root.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
