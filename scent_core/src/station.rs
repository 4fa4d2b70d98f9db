//! Shared wiring between the reception thread and the execution context.

use crate::bus::Outbox;
use crate::inbox::RecipeInbox;
use crate::inventory::InventoryLedger;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Latched start trigger for wait-for-start mode.
#[derive(Debug, Clone, Default)]
pub struct StartSignal(Arc<AtomicBool>);

impl StartSignal {
    pub fn fire(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a start is latched, without consuming it.
    pub fn is_fired(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Consume the trigger; true if it had been fired.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[derive(Clone)]
pub struct Station {
    pub inbox: Arc<RecipeInbox>,
    pub ledger: Arc<InventoryLedger>,
    pub outbox: Arc<dyn Outbox>,
    pub start: StartSignal,
}

impl Station {
    pub fn new(ledger: InventoryLedger, outbox: Arc<dyn Outbox>) -> Self {
        Self {
            inbox: Arc::new(RecipeInbox::new()),
            ledger: Arc::new(ledger),
            outbox,
            start: StartSignal::default(),
        }
    }
}

impl std::fmt::Debug for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Station")
            .field("inbox", &self.inbox)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
