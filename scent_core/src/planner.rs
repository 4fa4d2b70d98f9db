//! Motion planning: recipe steps to plate and valve timing.
//!
//! `MotionPlanner::plan` is pure. Rotation deltas are measured slot to
//! slot starting from the home slot and accumulate onto the plate angle
//! without wrapping modulo 360, so the plate keeps one consistent sense
//! of travel for a whole recipe. The last instruction brings the plate
//! back to the home angle and dispenses nothing.

use crate::config::PlannerCfg;
use crate::recipe::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Slot under the valve after the rotation; `None` for the return to home.
    pub slot_id: Option<u32>,
    pub rotate_delta_degrees: i64,
    pub rotate_duration_ms: u64,
    pub dispense_duration_ms: u64,
    pub settle_duration_ms: u64,
}

impl Instruction {
    #[must_use]
    pub const fn dispenses(&self) -> bool {
        self.slot_id.is_some()
    }

    #[must_use]
    pub const fn total_ms(&self) -> u64 {
        self.rotate_duration_ms
            .saturating_add(self.dispense_duration_ms)
            .saturating_add(self.settle_duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub instructions: Vec<Instruction>,
    /// Plate angle after every instruction has run.
    pub final_angle: i64,
}

impl Plan {
    #[must_use]
    pub fn total_ms(&self) -> u64 {
        self.instructions
            .iter()
            .fold(0u64, |acc, i| acc.saturating_add(i.total_ms()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MotionPlanner {
    cfg: PlannerCfg,
}

impl MotionPlanner {
    #[must_use]
    pub const fn new(cfg: PlannerCfg) -> Self {
        Self { cfg }
    }

    #[must_use]
    pub const fn cfg(&self) -> &PlannerCfg {
        &self.cfg
    }

    #[must_use]
    pub const fn home_angle(&self) -> i64 {
        self.cfg.home_angle
    }

    #[must_use]
    pub const fn rotate_ms(&self, delta_degrees: i64) -> u64 {
        delta_degrees.unsigned_abs().saturating_mul(self.cfg.ms_per_degree)
    }

    #[must_use]
    pub const fn dispense_ms(&self, proportion: u32) -> u64 {
        self.cfg.curve.dispense_ms(proportion)
    }

    /// Plan the visit of `steps` starting at `current_angle`.
    #[must_use]
    pub fn plan(&self, current_angle: i64, steps: &[Step]) -> Plan {
        let mut instructions = Vec::with_capacity(steps.len() + 1);
        let mut angle = current_angle;
        let mut previous = i64::from(self.cfg.home_slot);

        for step in steps {
            let slot = i64::from(step.slot_id);
            let delta = (slot - previous).saturating_mul(self.cfg.angle_per_slot);
            angle = angle.saturating_add(delta);
            previous = slot;
            instructions.push(Instruction {
                slot_id: Some(step.slot_id),
                rotate_delta_degrees: delta,
                rotate_duration_ms: self.rotate_ms(delta),
                dispense_duration_ms: self.dispense_ms(step.proportion),
                settle_duration_ms: self.cfg.settle_ms,
            });
        }

        let back = self.cfg.home_angle.saturating_sub(angle);
        instructions.push(Instruction {
            slot_id: None,
            rotate_delta_degrees: back,
            rotate_duration_ms: self.rotate_ms(back),
            dispense_duration_ms: 0,
            settle_duration_ms: 0,
        });

        Plan {
            instructions,
            final_angle: angle.saturating_add(back),
        }
    }
}
