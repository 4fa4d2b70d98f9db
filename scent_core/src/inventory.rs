//! Inventory ledger: per-slot stock with all-or-nothing reservation.
//!
//! A recipe's stock is checked and reserved in one step, then either
//! committed after a successful run or released after a failure. At most
//! one reservation is outstanding at a time, so no other recipe's
//! check/commit can interleave between a reservation and its commit.
//! Every mutation is written back to the store; a failed write is
//! reported but the in-memory table stays authoritative.

use crate::config::InventoryCfg;
use crate::error::{BlendError, LedgerError};
use crate::recipe::Recipe;
use crate::store::InventoryStore;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryItem {
    pub id: u32,
    pub current_ml: u32,
    pub max_ml: u32,
    pub min_threshold_ml: u32,
}

impl InventoryItem {
    #[must_use]
    pub const fn is_low(&self) -> bool {
        self.current_ml <= self.min_threshold_ml
    }
}

/// Opaque handle for an outstanding reservation; exchanged for a commit or a release.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reservation must be committed or released"]
pub struct ReservationToken {
    id: u64,
}

#[cfg(test)]
impl ReservationToken {
    pub(crate) const fn unissued(id: u64) -> Self {
        Self { id }
    }
}

/// Outcome of an administrative update.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub applied: Vec<u32>,
    pub rejected: Vec<LedgerError>,
}

impl UpdateReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

struct Reservation {
    id: u64,
    amounts: BTreeMap<u32, u32>,
}

struct LedgerState {
    items: BTreeMap<u32, InventoryItem>,
    outstanding: Option<Reservation>,
    next_token: u64,
}

impl LedgerState {
    fn rows(&self) -> Vec<(u32, u32)> {
        self.items.values().map(|i| (i.id, i.current_ml)).collect()
    }
}

pub struct InventoryLedger {
    state: Mutex<LedgerState>,
    names: BTreeMap<u32, String>,
    store: Box<dyn InventoryStore + Send + Sync>,
}

impl std::fmt::Debug for InventoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryLedger")
            .field("items", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl InventoryLedger {
    /// Load stock from `store`, or initialise every slot to the default
    /// capacity and write it out when nothing is persisted yet.
    pub fn open(
        cfg: &InventoryCfg,
        store: Box<dyn InventoryStore + Send + Sync>,
    ) -> Result<Self, BlendError> {
        let mut items: BTreeMap<u32, InventoryItem> = cfg
            .slots
            .iter()
            .map(|s| {
                (
                    s.id,
                    InventoryItem {
                        id: s.id,
                        current_ml: cfg.default_capacity_ml.min(s.max_ml),
                        max_ml: s.max_ml,
                        min_threshold_ml: s.min_threshold_ml,
                    },
                )
            })
            .collect();
        let names = cfg
            .slots
            .iter()
            .filter_map(|s| s.ingredient.clone().map(|n| (s.id, n)))
            .collect();

        let persisted = store.load()?;
        let fresh = persisted.is_none();
        if let Some(rows) = persisted {
            let mut seen = 0usize;
            for (id, ml) in rows {
                let Some(item) = items.get_mut(&id) else {
                    tracing::warn!(slot_id = id, "ignoring stock row for unknown slot");
                    continue;
                };
                if ml > item.max_ml {
                    tracing::warn!(
                        slot_id = id,
                        stored_ml = ml,
                        max_ml = item.max_ml,
                        "stored stock above capacity; clamping"
                    );
                }
                item.current_ml = ml.min(item.max_ml);
                seen += 1;
            }
            if seen < items.len() {
                tracing::warn!(
                    missing = items.len() - seen,
                    default_ml = cfg.default_capacity_ml,
                    "stock file lacks some slots; using default capacity"
                );
            }
        }

        let ledger = Self {
            state: Mutex::new(LedgerState {
                items,
                outstanding: None,
                next_token: 1,
            }),
            names,
            store,
        };
        if fresh {
            tracing::info!(
                slots = cfg.slots.len(),
                default_ml = cfg.default_capacity_ml,
                "no stock file; initialising defaults"
            );
            let rows = ledger.lock().rows();
            if let Err(e) = ledger.store.save(&rows) {
                tracing::error!(error = %e, "failed to write initial stock");
            }
        }
        Ok(ledger)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check every step of `recipe` against stock and reserve the amounts.
    /// Nothing is reserved if any slot fails.
    pub fn check_and_reserve(&self, recipe: &Recipe) -> Result<ReservationToken, LedgerError> {
        let mut st = self.lock();
        if st.outstanding.is_some() {
            return Err(LedgerError::ReservationOutstanding);
        }
        let needs = recipe.requirements();
        for (&slot_id, &required) in &needs {
            let item = st
                .items
                .get(&slot_id)
                .ok_or(LedgerError::InvalidSlot { slot_id })?;
            if item.current_ml < required {
                return Err(LedgerError::InsufficientStock {
                    slot_id,
                    required,
                    available: item.current_ml,
                });
            }
        }
        let id = st.next_token;
        st.next_token += 1;
        tracing::debug!(token = id, slots = needs.len(), "stock reserved");
        st.outstanding = Some(Reservation {
            id,
            amounts: needs,
        });
        Ok(ReservationToken { id })
    }

    /// Consume the reserved stock and persist the table.
    ///
    /// An `Err(Persistence)` still leaves the in-memory stock decremented.
    pub fn commit(&self, token: ReservationToken) -> Result<(), BlendError> {
        let mut st = self.lock();
        let res = match st.outstanding.take() {
            Some(r) if r.id == token.id => r,
            other => {
                st.outstanding = other;
                return Err(LedgerError::UnknownReservation.into());
            }
        };
        for (slot_id, ml) in res.amounts {
            if let Some(item) = st.items.get_mut(&slot_id) {
                item.current_ml = item.current_ml.saturating_sub(ml);
                tracing::debug!(slot_id, used_ml = ml, left_ml = item.current_ml, "committed");
                if item.is_low() {
                    tracing::warn!(
                        slot_id,
                        ingredient = self.ingredient(slot_id).unwrap_or("-"),
                        left_ml = item.current_ml,
                        threshold_ml = item.min_threshold_ml,
                        "stock at or below threshold"
                    );
                }
            }
        }
        self.store.save(&st.rows())
    }

    /// Drop the reservation without touching stock.
    pub fn release(&self, token: ReservationToken) -> Result<(), LedgerError> {
        let mut st = self.lock();
        match st.outstanding.take() {
            Some(r) if r.id == token.id => {
                tracing::debug!(token = r.id, "reservation released");
                Ok(())
            }
            other => {
                st.outstanding = other;
                Err(LedgerError::UnknownReservation)
            }
        }
    }

    pub fn query(&self, slot_id: u32) -> Result<u32, LedgerError> {
        self.lock()
            .items
            .get(&slot_id)
            .map(|i| i.current_ml)
            .ok_or(LedgerError::InvalidSlot { slot_id })
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<InventoryItem> {
        self.lock().items.values().copied().collect()
    }

    #[must_use]
    pub fn low_stock(&self) -> Vec<InventoryItem> {
        self.lock()
            .items
            .values()
            .filter(|i| i.is_low())
            .copied()
            .collect()
    }

    #[must_use]
    pub fn ingredient(&self, slot_id: u32) -> Option<&str> {
        self.names.get(&slot_id).map(String::as_str)
    }

    #[must_use]
    pub fn has_outstanding(&self) -> bool {
        self.lock().outstanding.is_some()
    }

    /// Administrative override of slot levels, bypassing reservation.
    ///
    /// Valid rows are applied even when others are rejected; the table is
    /// persisted once if anything changed.
    pub fn apply_updates(&self, updates: &[(u32, i64)]) -> Result<UpdateReport, BlendError> {
        let mut st = self.lock();
        let mut report = UpdateReport::default();
        for &(slot_id, capacity_ml) in updates {
            let Some(item) = st.items.get_mut(&slot_id) else {
                report.rejected.push(LedgerError::InvalidSlot { slot_id });
                continue;
            };
            match u32::try_from(capacity_ml) {
                Ok(ml) if ml <= item.max_ml => {
                    item.current_ml = ml;
                    report.applied.push(slot_id);
                }
                _ => report.rejected.push(LedgerError::CapacityOutOfRange {
                    slot_id,
                    capacity_ml,
                    max_ml: item.max_ml,
                }),
            }
        }
        for e in &report.rejected {
            tracing::warn!(error = %e, "update row rejected");
        }
        if !report.applied.is_empty() {
            tracing::info!(slots = ?report.applied, "stock updated");
            self.store.save(&st.rows())?;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryStore;
    use crate::recipe::Step;

    fn ledger(rows: &[(u32, u32)]) -> InventoryLedger {
        InventoryLedger::open(
            &InventoryCfg::uniform(4, 500, 500, 50),
            Box::new(MemoryStore::with_rows(rows)),
        )
        .unwrap()
    }

    #[test]
    fn token_from_another_reservation_is_refused() {
        let l = ledger(&[(1, 100)]);
        let r = Recipe::new(vec![Step::new(1, 10)], None, 20).unwrap();
        let t = l.check_and_reserve(&r).unwrap();
        let bogus = ReservationToken { id: 999 };
        assert_eq!(l.release(bogus), Err(LedgerError::UnknownReservation));
        assert!(l.has_outstanding());
        l.commit(t).unwrap();
        assert!(!l.has_outstanding());
    }

    #[test]
    fn missing_slots_get_default_capacity() {
        let l = ledger(&[(1, 100)]);
        assert_eq!(l.query(1), Ok(100));
        assert_eq!(l.query(2), Ok(500));
        assert_eq!(l.query(5), Err(LedgerError::InvalidSlot { slot_id: 5 }));
    }
}
