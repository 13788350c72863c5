//! Per-battle serialization.
//!
//! Every command against an existing battle holds that battle's lock for the
//! whole load → resolve → persist cycle, so two actions on the same battle
//! never interleave inside one process. Different battles proceed in
//! parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use spellbound_core::error::DomainError;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

type BattleLock = Arc<tokio::sync::Mutex<()>>;

/// Registry of one async mutex per battle identifier.
#[derive(Debug, Default)]
pub struct BattleLocks {
    locks: Mutex<HashMap<Uuid, BattleLock>>,
}

impl BattleLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `battle_id`.
    ///
    /// The guard releases the battle when dropped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the registry mutex is
    /// poisoned.
    pub async fn acquire(&self, battle_id: Uuid) -> Result<OwnedMutexGuard<()>, DomainError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|e| DomainError::Infrastructure(format!("lock registry poisoned: {e}")))?;
            // Entries only the registry still references are idle.
            locks.retain(|id, lock| *id == battle_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(battle_id).or_default())
        };
        Ok(lock.lock_owned().await)
    }

    /// Number of battles currently tracked; zero if the registry is
    /// poisoned.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_battle_is_serialized() {
        let locks = Arc::new(BattleLocks::new());
        let battle_id = Uuid::new_v4();

        let guard = locks.acquire(battle_id).await.unwrap();

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire(battle_id).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_different_battles_do_not_block() {
        let locks = BattleLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await.unwrap();
        let _b = locks.acquire(Uuid::new_v4()).await.unwrap();
        assert_eq!(locks.tracked(), 2);
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = BattleLocks::new();
        for _ in 0..5 {
            let guard = locks.acquire(Uuid::new_v4()).await.unwrap();
            drop(guard);
        }
        let _held = locks.acquire(Uuid::new_v4()).await.unwrap();
        assert_eq!(locks.tracked(), 1);
    }
}
