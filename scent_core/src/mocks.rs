//! Test and helper mocks for scent_core

use crate::bus::{Outbound, Outbox, StatusKind};
use crate::error::BlendError;
use crate::store::{InventoryStore, StockRows};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory inventory store. Clones share contents, so a test can keep
/// one handle while the ledger owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Option<StockRows>>>,
    failing: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Nothing persisted yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rows(rows: &[(u32, u32)]) -> Self {
        let s = Self::default();
        *s.rows.lock().unwrap_or_else(PoisonError::into_inner) = Some(rows.to_vec());
        s
    }

    /// Make subsequent saves fail with a persistence error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    #[must_use]
    pub fn rows(&self) -> Option<StockRows> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl InventoryStore for MemoryStore {
    fn load(&self) -> Result<Option<StockRows>, BlendError> {
        Ok(self.rows())
    }

    fn save(&self, rows: &[(u32, u32)]) -> Result<(), BlendError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(BlendError::Persistence("memory store set to fail".into()));
        }
        *self.rows.lock().unwrap_or_else(PoisonError::into_inner) = Some(rows.to_vec());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Outbox that keeps every published envelope.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutbox {
    sent: Arc<Mutex<Vec<Outbound>>>,
}

impl RecordingOutbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<Outbound> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the lifecycle statuses, in order.
    #[must_use]
    pub fn statuses(&self) -> Vec<StatusKind> {
        self.messages().iter().filter_map(Outbound::status).collect()
    }
}

impl Outbox for RecordingOutbox {
    fn publish(&self, msg: Outbound) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(msg);
    }
}
