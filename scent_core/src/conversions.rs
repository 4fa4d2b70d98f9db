//! `From` implementations bridging `scent_config` types to `scent_core` types.

use crate::config::{
    DispenseCurve, InventoryCfg, PlannerCfg, RecipeCfg, RunnerCfg, SlotSpec, StartMode,
};

// ── DispenseCurve ────────────────────────────────────────────────────────────

impl From<&scent_config::ValveCfg> for DispenseCurve {
    fn from(c: &scent_config::ValveCfg) -> Self {
        match c.curve {
            scent_config::CurveKind::Linear => Self::Linear {
                ms_per_unit: c.ms_per_proportion_unit,
            },
            scent_config::CurveKind::Drops => Self::Drops {
                drops_per_unit_x10: c.drops_per_unit_x10,
                ms_per_drop: c.ms_per_drop,
            },
        }
    }
}

// ── PlannerCfg ───────────────────────────────────────────────────────────────

impl From<&scent_config::Config> for PlannerCfg {
    fn from(c: &scent_config::Config) -> Self {
        Self {
            angle_per_slot: c.plate.angle_per_slot,
            ms_per_degree: c.plate.ms_per_degree,
            settle_ms: c.valve.settle_ms,
            home_slot: c.plate.home_slot,
            home_angle: c.plate.home_angle,
            curve: DispenseCurve::from(&c.valve),
        }
    }
}

// ── InventoryCfg ─────────────────────────────────────────────────────────────

impl From<&scent_config::Config> for InventoryCfg {
    fn from(c: &scent_config::Config) -> Self {
        let inv = &c.inventory;
        let slots = (1..=inv.slot_count)
            .map(|id| {
                let row = c.slots.iter().find(|r| r.slot == id);
                SlotSpec {
                    id,
                    ingredient: row.map(|r| r.ingredient.clone()),
                    max_ml: row.and_then(|r| r.max_ml).unwrap_or(inv.max_ml),
                    min_threshold_ml: row
                        .and_then(|r| r.min_threshold_ml)
                        .unwrap_or(inv.min_threshold_ml),
                }
            })
            .collect();
        Self {
            slots,
            default_capacity_ml: inv.default_capacity_ml,
        }
    }
}

// ── RecipeCfg ────────────────────────────────────────────────────────────────

impl From<&scent_config::RecipeCfg> for RecipeCfg {
    fn from(c: &scent_config::RecipeCfg) -> Self {
        Self {
            carrier_proportion: c.carrier_proportion,
            proportion_divisor: c.proportion_divisor.max(1),
            max_steps: c.max_steps,
        }
    }
}

// ── RunnerCfg ────────────────────────────────────────────────────────────────

impl From<scent_config::StartMode> for StartMode {
    fn from(m: scent_config::StartMode) -> Self {
        match m {
            scent_config::StartMode::Auto => Self::Auto,
            scent_config::StartMode::Command => Self::Command,
        }
    }
}

impl From<&scent_config::RunnerCfg> for RunnerCfg {
    fn from(c: &scent_config::RunnerCfg) -> Self {
        Self {
            start: c.start.into(),
            poll_ms: c.poll_ms,
            complete_dwell_ms: c.complete_dwell_ms,
            ready_timeout_ms: c.ready_timeout_ms,
        }
    }
}
