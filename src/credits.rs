use crate::storage::{self, StorageManager};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-user credit balance. One video = one credit. Balances are created
/// lazily at zero on first read and only ever move through deduct/refund.
pub trait CreditLedger: Send + Sync {
    fn balance(&self, user_id: &str) -> anyhow::Result<u32>;

    /// Returns false (and mutates nothing) when the balance is insufficient.
    fn deduct(&self, user_id: &str, n: u32) -> anyhow::Result<bool>;

    /// Unconditional add, used to hand back credits for failed work.
    fn refund(&self, user_id: &str, n: u32) -> anyhow::Result<()>;
}

const CREDITS_FILE: &str = "credits.json";
const FINGERPRINTS_FILE: &str = "fingerprints.json";

#[derive(Clone)]
pub struct BackendJson {
    balances: Arc<RwLock<HashMap<String, u32>>>,
    store: storage::BackendLocal,
}

impl BackendJson {
    pub fn load(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        let balances = if store.exists(CREDITS_FILE) {
            serde_json::from_slice(&store.read(CREDITS_FILE)?)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            balances: Arc::new(RwLock::new(balances)),
            store,
        })
    }

    fn persist(&self, balances: &HashMap<String, u32>) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(balances)?;
        self.store.write(CREDITS_FILE, &data)?;
        Ok(())
    }
}

impl CreditLedger for BackendJson {
    fn balance(&self, user_id: &str) -> anyhow::Result<u32> {
        let balances = self.balances.read().unwrap();
        Ok(balances.get(user_id).copied().unwrap_or(0))
    }

    fn deduct(&self, user_id: &str, n: u32) -> anyhow::Result<bool> {
        let mut balances = self.balances.write().unwrap();
        let balance = balances.get(user_id).copied().unwrap_or(0);

        if balance < n {
            return Ok(false);
        }

        balances.insert(user_id.to_string(), balance - n);
        self.persist(&balances)?;
        Ok(true)
    }

    fn refund(&self, user_id: &str, n: u32) -> anyhow::Result<()> {
        let mut balances = self.balances.write().unwrap();
        let balance = balances.get(user_id).copied().unwrap_or(0);
        balances.insert(user_id.to_string(), balance + n);
        self.persist(&balances)?;
        Ok(())
    }
}

/// Submission counter for anonymous fingerprints. Anonymous jobs never touch
/// the credit ledger; they are gated here, at the submission layer.
#[derive(Clone)]
pub struct FingerprintGate {
    counts: Arc<RwLock<HashMap<String, u32>>>,
    store: storage::BackendLocal,
}

impl FingerprintGate {
    pub fn load(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        let counts = if store.exists(FINGERPRINTS_FILE) {
            serde_json::from_slice(&store.read(FINGERPRINTS_FILE)?)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            counts: Arc::new(RwLock::new(counts)),
            store,
        })
    }

    /// Returns false without incrementing once the fingerprint hits the limit.
    pub fn check_and_increment(&self, fingerprint: &str, limit: u32) -> anyhow::Result<bool> {
        let mut counts = self.counts.write().unwrap();
        let used = counts.get(fingerprint).copied().unwrap_or(0);

        if used >= limit {
            return Ok(false);
        }

        counts.insert(fingerprint.to_string(), used + 1);
        let data = serde_json::to_vec_pretty(&*counts)?;
        self.store.write(FINGERPRINTS_FILE, &data)?;
        Ok(true)
    }
}
