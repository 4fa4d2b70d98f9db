//! Single-slot handoff between the reception thread and the execution context.
//!
//! One lock guards both the buffered recipe and the in-flight flag, so the
//! execution side never observes a half-written recipe and a second
//! submission can never overwrite the first.

use crate::error::BlendError;
use crate::recipe::Recipe;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Pending(Recipe),
    InFlight,
}

#[derive(Debug, Default)]
pub struct RecipeInbox {
    slot: Mutex<Slot>,
}

impl RecipeInbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept `recipe` only if nothing is pending or executing.
    pub fn submit(&self, recipe: Recipe) -> Result<(), BlendError> {
        let mut slot = self.lock();
        match *slot {
            Slot::Empty => {
                tracing::debug!(steps = recipe.steps().len(), "recipe queued");
                *slot = Slot::Pending(recipe);
                Ok(())
            }
            Slot::Pending(_) | Slot::InFlight => {
                tracing::warn!("recipe dropped: another recipe is pending or running");
                Err(BlendError::RecipeRejected)
            }
        }
    }

    /// Remove the pending recipe and mark it in flight until `finish`.
    pub fn take(&self) -> Option<Recipe> {
        let mut slot = self.lock();
        match std::mem::take(&mut *slot) {
            Slot::Pending(r) => {
                *slot = Slot::InFlight;
                Some(r)
            }
            other => {
                *slot = other;
                None
            }
        }
    }

    /// The taken recipe is done (completed, failed or rejected).
    pub fn finish(&self) {
        let mut slot = self.lock();
        if matches!(*slot, Slot::InFlight) {
            *slot = Slot::Empty;
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(*self.lock(), Slot::Empty)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        matches!(*self.lock(), Slot::Pending(_))
    }
}
