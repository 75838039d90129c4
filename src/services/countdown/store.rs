//! Deadline storage behind the countdown engine.
//!
//! The engine only sees [`CountdownStore`]. Tests use the in-memory store;
//! the console uses [`PersistentCountdownStore`], which writes through to
//! SQLite and falls back to memory when the database stops cooperating.

use std::cell::Cell;
use std::collections::BTreeMap;

use super::models::CountdownKey;
use super::repository::CountdownRepository;
use crate::models::event::EventId;
use crate::services::database::Database;

pub trait CountdownStore {
    /// Records `deadline_ms` for `key`, replacing any previous entry.
    fn set_deadline(&mut self, key: &CountdownKey, deadline_ms: i64);

    fn get_deadline(&self, key: &CountdownKey) -> Option<i64>;

    /// Removes the entry. Clearing a missing key is a no-op.
    fn clear_deadline(&mut self, key: &CountdownKey);

    fn keys(&self) -> Vec<CountdownKey>;

    fn clear_event(&mut self, event_id: &EventId) {
        for key in self.keys() {
            if key.event_id() == event_id {
                self.clear_deadline(&key);
            }
        }
    }

    fn clear_all(&mut self) {
        for key in self.keys() {
            self.clear_deadline(&key);
        }
    }
}

impl<S: CountdownStore + ?Sized> CountdownStore for Box<S> {
    fn set_deadline(&mut self, key: &CountdownKey, deadline_ms: i64) {
        (**self).set_deadline(key, deadline_ms)
    }

    fn get_deadline(&self, key: &CountdownKey) -> Option<i64> {
        (**self).get_deadline(key)
    }

    fn clear_deadline(&mut self, key: &CountdownKey) {
        (**self).clear_deadline(key)
    }

    fn keys(&self) -> Vec<CountdownKey> {
        (**self).keys()
    }

    fn clear_event(&mut self, event_id: &EventId) {
        (**self).clear_event(event_id)
    }

    fn clear_all(&mut self) {
        (**self).clear_all()
    }
}

/// Deadlines that live as long as the process.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCountdownStore {
    entries: BTreeMap<CountdownKey, i64>,
}

impl InMemoryCountdownStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CountdownStore for InMemoryCountdownStore {
    fn set_deadline(&mut self, key: &CountdownKey, deadline_ms: i64) {
        self.entries.insert(key.clone(), deadline_ms);
    }

    fn get_deadline(&self, key: &CountdownKey) -> Option<i64> {
        self.entries.get(key).copied()
    }

    fn clear_deadline(&mut self, key: &CountdownKey) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<CountdownKey> {
        self.entries.keys().cloned().collect()
    }

    fn clear_event(&mut self, event_id: &EventId) {
        self.entries.retain(|key, _| key.event_id() != event_id);
    }

    fn clear_all(&mut self) {
        self.entries.clear();
    }
}

/// SQLite-backed deadlines with an in-memory shadow copy.
///
/// Every write goes to both. The first database failure switches the store
/// to memory-only for the rest of the process; nothing is surfaced to the
/// engine.
pub struct PersistentCountdownStore<'a> {
    repo: CountdownRepository<'a>,
    memory: InMemoryCountdownStore,
    degraded: Cell<bool>,
}

impl<'a> PersistentCountdownStore<'a> {
    /// Opens the store and loads the persisted entries into the shadow copy.
    pub fn new(db: &'a Database) -> Self {
        let store = Self {
            repo: CountdownRepository::new(db.connection()),
            memory: InMemoryCountdownStore::new(),
            degraded: Cell::new(false),
        };
        store.load_shadow()
    }

    fn load_shadow(mut self) -> Self {
        match self.repo.get_all() {
            Ok(entries) => {
                log::debug!("Loaded {} persisted countdown deadline(s)", entries.len());
                for (key, deadline_ms) in entries {
                    self.memory.set_deadline(&key, deadline_ms);
                }
            }
            Err(err) => self.degrade(&err),
        }
        self
    }

    /// True once the store has fallen back to memory-only.
    pub fn is_degraded(&self) -> bool {
        self.degraded.get()
    }

    fn degrade(&self, err: &anyhow::Error) {
        if !self.degraded.replace(true) {
            log::warn!(
                "Countdown storage unavailable, keeping deadlines in memory only: {:#}",
                err
            );
        }
    }
}

impl CountdownStore for PersistentCountdownStore<'_> {
    fn set_deadline(&mut self, key: &CountdownKey, deadline_ms: i64) {
        self.memory.set_deadline(key, deadline_ms);
        if self.is_degraded() {
            return;
        }
        if let Err(err) = self.repo.upsert(key, deadline_ms) {
            self.degrade(&err);
        }
    }

    fn get_deadline(&self, key: &CountdownKey) -> Option<i64> {
        if self.is_degraded() {
            return self.memory.get_deadline(key);
        }
        match self.repo.get(key) {
            Ok(value) => value,
            Err(err) => {
                self.degrade(&err);
                self.memory.get_deadline(key)
            }
        }
    }

    fn clear_deadline(&mut self, key: &CountdownKey) {
        self.memory.clear_deadline(key);
        if self.is_degraded() {
            return;
        }
        if let Err(err) = self.repo.delete(key) {
            self.degrade(&err);
        }
    }

    fn keys(&self) -> Vec<CountdownKey> {
        if self.is_degraded() {
            return self.memory.keys();
        }
        match self.repo.get_all() {
            Ok(entries) => entries.into_iter().map(|(key, _)| key).collect(),
            Err(err) => {
                self.degrade(&err);
                self.memory.keys()
            }
        }
    }

    fn clear_event(&mut self, event_id: &EventId) {
        self.memory.clear_event(event_id);
        if self.is_degraded() {
            return;
        }
        if let Err(err) = self.repo.delete_for_event(event_id) {
            self.degrade(&err);
        }
    }

    fn clear_all(&mut self) {
        self.memory.clear_all();
        if self.is_degraded() {
            return;
        }
        if let Err(err) = self.repo.delete_all() {
            self.degrade(&err);
        }
    }
}
