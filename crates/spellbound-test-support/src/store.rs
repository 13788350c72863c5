//! Test stores: in-memory `BattleStore` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use spellbound_combat::application::ports::BattleStore;
use spellbound_combat::domain::definitions::Profile;
use spellbound_combat::domain::session::{BattleLogEntry, BattleSession};
use spellbound_core::error::DomainError;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<Uuid, BattleSession>,
    log: Vec<BattleLogEntry>,
    profiles: HashMap<Uuid, Profile>,
    session_writes: usize,
    profile_writes: usize,
    fail_log_writes: bool,
    fail_profile_writes: bool,
}

impl Tables {
    fn check_version(
        &self,
        session: &BattleSession,
        expected_version: i64,
    ) -> Result<(), DomainError> {
        let actual = self
            .sessions
            .get(&session.id)
            .map(|s| s.version)
            .ok_or(DomainError::BattleNotFound(session.id))?;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                battle_id: session.id,
                expected: expected_version,
                actual,
            });
        }
        Ok(())
    }

    fn check_log_writable(&self) -> Result<(), DomainError> {
        if self.fail_log_writes {
            return Err(DomainError::Infrastructure("battle log write failed".into()));
        }
        Ok(())
    }

    fn check_profile_writable(&self) -> Result<(), DomainError> {
        if self.fail_profile_writes {
            return Err(DomainError::Infrastructure("profile write failed".into()));
        }
        Ok(())
    }
}

/// A battle store backed by in-process maps, with the same optimistic
/// version check as the database store. Exposes snapshots of what was
/// written for assertions, and can be told to fail log or profile writes.
#[derive(Debug, Default)]
pub struct InMemoryBattleStore {
    tables: Mutex<Tables>,
}

impl InMemoryBattleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_profile(self, profile: Profile) -> Self {
        self.tables
            .lock()
            .unwrap()
            .profiles
            .insert(profile.id, profile);
        self
    }

    /// Overwrite a session snapshot directly, bypassing the version check.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn put_session(&self, session: BattleSession) {
        self.tables
            .lock()
            .unwrap()
            .sessions
            .insert(session.id, session);
    }

    /// The stored snapshot of a session.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn session(&self, battle_id: Uuid) -> Option<BattleSession> {
        self.tables.lock().unwrap().sessions.get(&battle_id).cloned()
    }

    /// The stored profile.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn profile(&self, profile_id: Uuid) -> Option<Profile> {
        self.tables.lock().unwrap().profiles.get(&profile_id).cloned()
    }

    /// Every log entry appended for a battle.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn log(&self, battle_id: Uuid) -> Vec<BattleLogEntry> {
        self.tables
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|e| e.battle_id == battle_id)
            .cloned()
            .collect()
    }

    /// Make every log append fail until switched off again.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_log_writes(&self, fail: bool) {
        self.tables.lock().unwrap().fail_log_writes = fail;
    }

    /// Make every profile write fail until switched off again.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_profile_writes(&self, fail: bool) {
        self.tables.lock().unwrap().fail_profile_writes = fail;
    }

    /// Number of successful session snapshot writes.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn session_writes(&self) -> usize {
        self.tables.lock().unwrap().session_writes
    }

    /// Number of successful profile writes.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn profile_writes(&self) -> usize {
        self.tables.lock().unwrap().profile_writes
    }
}

#[async_trait]
impl BattleStore for InMemoryBattleStore {
    async fn get_session(&self, battle_id: Uuid) -> Result<Option<BattleSession>, DomainError> {
        Ok(self.session(battle_id))
    }

    async fn create_session(&self, session: &BattleSession) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.sessions.contains_key(&session.id) {
            return Err(DomainError::Infrastructure(format!(
                "duplicate battle id {}",
                session.id
            )));
        }
        tables.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn update_session(
        &self,
        session: &BattleSession,
        expected_version: i64,
    ) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().unwrap();
        tables.check_version(session, expected_version)?;
        tables.sessions.insert(session.id, session.clone());
        tables.session_writes += 1;
        Ok(())
    }

    async fn append_log_entry(&self, entry: &BattleLogEntry) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().unwrap();
        tables.check_log_writable()?;
        tables.log.push(entry.clone());
        Ok(())
    }

    async fn battle_log(&self, battle_id: Uuid) -> Result<Vec<BattleLogEntry>, DomainError> {
        Ok(self.log(battle_id))
    }

    async fn get_profile(&self, profile_id: Uuid) -> Result<Option<Profile>, DomainError> {
        Ok(self.profile(profile_id))
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().unwrap();
        tables.check_profile_writable()?;
        tables.profiles.insert(profile.id, profile.clone());
        tables.profile_writes += 1;
        Ok(())
    }

    async fn commit(
        &self,
        session: &BattleSession,
        expected_version: i64,
        entries: &[BattleLogEntry],
        profile: Option<&Profile>,
    ) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().unwrap();

        // Every check runs before the first write.
        tables.check_version(session, expected_version)?;
        if !entries.is_empty() {
            tables.check_log_writable()?;
        }
        if profile.is_some() {
            tables.check_profile_writable()?;
        }

        tables.sessions.insert(session.id, session.clone());
        tables.session_writes += 1;
        tables.log.extend_from_slice(entries);
        if let Some(profile) = profile {
            tables.profiles.insert(profile.id, profile.clone());
            tables.profile_writes += 1;
        }
        Ok(())
    }
}

/// A battle store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingBattleStore;

fn refused<T>() -> Result<T, DomainError> {
    Err(DomainError::Infrastructure("connection refused".into()))
}

#[async_trait]
impl BattleStore for FailingBattleStore {
    async fn get_session(&self, _battle_id: Uuid) -> Result<Option<BattleSession>, DomainError> {
        refused()
    }

    async fn create_session(&self, _session: &BattleSession) -> Result<(), DomainError> {
        refused()
    }

    async fn update_session(
        &self,
        _session: &BattleSession,
        _expected_version: i64,
    ) -> Result<(), DomainError> {
        refused()
    }

    async fn append_log_entry(&self, _entry: &BattleLogEntry) -> Result<(), DomainError> {
        refused()
    }

    async fn battle_log(&self, _battle_id: Uuid) -> Result<Vec<BattleLogEntry>, DomainError> {
        refused()
    }

    async fn get_profile(&self, _profile_id: Uuid) -> Result<Option<Profile>, DomainError> {
        refused()
    }

    async fn update_profile(&self, _profile: &Profile) -> Result<(), DomainError> {
        refused()
    }

    async fn commit(
        &self,
        _session: &BattleSession,
        _expected_version: i64,
        _entries: &[BattleLogEntry],
        _profile: Option<&Profile>,
    ) -> Result<(), DomainError> {
        refused()
    }
}
