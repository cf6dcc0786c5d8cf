//! In-memory HookRun idempotency ledger (§3 HookRun, §4.J step 3).

use std::collections::HashMap;

use async_trait::async_trait;
use cco_proto::{HookError, HookRun};
use tokio::sync::RwLock;

/// Idempotency ledger backed by a `HashMap<String, HookRun>` behind a
/// `RwLock`, keyed on `idempotency_key`.
pub struct MemoryHookRunLedger {
    runs: RwLock<HashMap<String, HookRun>>,
}

impl MemoryHookRunLedger {
    /// Create a new, empty ledger.
    pub fn new() -> Self {
        Self { runs: RwLock::new(HashMap::new()) }
    }
}

impl Default for MemoryHookRunLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl cco_proto::HookRunLedger for MemoryHookRunLedger {
    async fn insert_if_absent(&self, run: HookRun) -> Result<Option<HookRun>, HookError> {
        let mut runs = self.runs.write().await;
        if let Some(existing) = runs.get(&run.idempotency_key) {
            return Ok(Some(existing.clone()));
        }
        runs.insert(run.idempotency_key.clone(), run);
        Ok(None)
    }

    async fn get(&self, idempotency_key: &str) -> Result<Option<HookRun>, HookError> {
        let runs = self.runs.read().await;
        Ok(runs.get(idempotency_key).cloned())
    }
}
