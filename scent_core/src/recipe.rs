//! Recipe data model.
//!
//! A `Recipe` is an ordered list of `Step`s (insertion order is the physical
//! visit order) plus an optional carrier step appended by the device. It is
//! validated once on construction and immutable afterwards.

use std::collections::BTreeMap;

/// Upper bound of the proportion scale.
pub const MAX_PROPORTION: u32 = 100;

/// Dispense `proportion` units of the ingredient held in `slot_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Step {
    pub slot_id: u32,
    pub proportion: u32,
}

impl Step {
    #[must_use]
    pub const fn new(slot_id: u32, proportion: u32) -> Self {
        Self {
            slot_id,
            proportion,
        }
    }

    /// Millilitres consumed by this step (one ml per proportion unit).
    #[must_use]
    pub const fn required_ml(&self) -> u32 {
        self.proportion
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipeError {
    #[error("recipe has no steps")]
    Empty,
    #[error("recipe has {count} steps, limit is {max}")]
    TooManySteps { count: usize, max: usize },
    #[error("slot ids start at 1")]
    ZeroSlot,
    #[error("proportion {proportion} for slot {slot_id} exceeds {MAX_PROPORTION}")]
    ProportionOutOfRange { slot_id: u32, proportion: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    steps: Vec<Step>,
    carrier: Option<Step>,
}

impl Recipe {
    /// Build a recipe. Slot ids are not checked against the rig here;
    /// that happens at inventory check time.
    pub fn new(
        steps: Vec<Step>,
        carrier: Option<Step>,
        max_steps: usize,
    ) -> Result<Self, RecipeError> {
        if steps.is_empty() {
            return Err(RecipeError::Empty);
        }
        if steps.len() > max_steps {
            return Err(RecipeError::TooManySteps {
                count: steps.len(),
                max: max_steps,
            });
        }
        for s in steps.iter().chain(carrier.iter()) {
            if s.slot_id == 0 {
                return Err(RecipeError::ZeroSlot);
            }
            if s.proportion > MAX_PROPORTION {
                return Err(RecipeError::ProportionOutOfRange {
                    slot_id: s.slot_id,
                    proportion: s.proportion,
                });
            }
        }
        Ok(Self { steps, carrier })
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub const fn carrier(&self) -> Option<&Step> {
        self.carrier.as_ref()
    }

    /// Operator steps followed by the carrier step, in visit order.
    #[must_use]
    pub fn sequence(&self) -> Vec<Step> {
        self.steps.iter().chain(self.carrier.iter()).copied().collect()
    }

    /// Total millilitres needed per slot; a slot visited twice sums both visits.
    #[must_use]
    pub fn requirements(&self) -> BTreeMap<u32, u32> {
        let mut out = BTreeMap::new();
        for s in self.steps.iter().chain(self.carrier.iter()) {
            let e = out.entry(s.slot_id).or_insert(0u32);
            *e = e.saturating_add(s.required_ml());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carrier_is_visited_last() {
        let r = Recipe::new(
            vec![Step::new(3, 10), Step::new(1, 20)],
            Some(Step::new(12, 30)),
            20,
        )
        .unwrap();
        let slots: Vec<u32> = r.sequence().iter().map(|s| s.slot_id).collect();
        assert_eq!(slots, vec![3, 1, 12]);
    }

    #[test]
    fn repeated_slots_are_aggregated() {
        let r = Recipe::new(vec![Step::new(2, 10), Step::new(2, 15)], None, 20).unwrap();
        assert_eq!(r.requirements().get(&2), Some(&25));
    }

    #[test]
    fn rejects_bad_shapes() {
        assert_eq!(Recipe::new(vec![], None, 20), Err(RecipeError::Empty));
        assert_eq!(
            Recipe::new(vec![Step::new(0, 1)], None, 20),
            Err(RecipeError::ZeroSlot)
        );
        assert!(matches!(
            Recipe::new(vec![Step::new(1, 101)], None, 20),
            Err(RecipeError::ProportionOutOfRange { .. })
        ));
        assert!(matches!(
            Recipe::new(vec![Step::new(1, 1); 3], None, 2),
            Err(RecipeError::TooManySteps { count: 3, max: 2 })
        ));
    }
}
