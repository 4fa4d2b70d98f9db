//! Runtime configuration consumed by the orchestrator.
//!
//! These are resolved forms of the `scent_config` schema; see
//! `conversions` for the mapping.

/// Proportion to valve-open-time mapping. Both variants are monotonic
/// non-decreasing in the proportion and free of hidden state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispenseCurve {
    /// `proportion * ms_per_unit`
    Linear { ms_per_unit: u64 },
    /// `(proportion * drops_per_unit_x10 / 10) * ms_per_drop`, drops truncated
    Drops {
        drops_per_unit_x10: u64,
        ms_per_drop: u64,
    },
}

impl DispenseCurve {
    #[must_use]
    pub const fn dispense_ms(&self, proportion: u32) -> u64 {
        let p = proportion as u64;
        match *self {
            Self::Linear { ms_per_unit } => p.saturating_mul(ms_per_unit),
            Self::Drops {
                drops_per_unit_x10,
                ms_per_drop,
            } => (p.saturating_mul(drops_per_unit_x10) / 10).saturating_mul(ms_per_drop),
        }
    }
}

impl Default for DispenseCurve {
    fn default() -> Self {
        Self::Linear { ms_per_unit: 15 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerCfg {
    pub angle_per_slot: i64,
    pub ms_per_degree: u64,
    pub settle_ms: u64,
    pub home_slot: u32,
    pub home_angle: i64,
    pub curve: DispenseCurve,
}

impl Default for PlannerCfg {
    fn default() -> Self {
        Self {
            angle_per_slot: 30,
            ms_per_degree: 10,
            settle_ms: 500,
            home_slot: 2,
            home_angle: 60,
            curve: DispenseCurve::default(),
        }
    }
}

/// Per-slot limits after merging the slot table over inventory defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub id: u32,
    pub ingredient: Option<String>,
    pub max_ml: u32,
    pub min_threshold_ml: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryCfg {
    /// One entry per slot, ids `1..=slots.len()`.
    pub slots: Vec<SlotSpec>,
    /// Stock for slots absent from the persisted file.
    pub default_capacity_ml: u32,
}

impl InventoryCfg {
    /// `count` slots sharing the same limits and no ingredient names.
    #[must_use]
    pub fn uniform(count: u32, default_capacity_ml: u32, max_ml: u32, min_threshold_ml: u32) -> Self {
        Self {
            slots: (1..=count)
                .map(|id| SlotSpec {
                    id,
                    ingredient: None,
                    max_ml,
                    min_threshold_ml,
                })
                .collect(),
            default_capacity_ml,
        }
    }
}

impl Default for InventoryCfg {
    fn default() -> Self {
        Self::uniform(12, 500, 500, 50)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeCfg {
    pub carrier_proportion: u32,
    pub proportion_divisor: u32,
    pub max_steps: usize,
}

impl Default for RecipeCfg {
    fn default() -> Self {
        Self {
            carrier_proportion: 30,
            proportion_divisor: 1,
            max_steps: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartMode {
    #[default]
    Auto,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerCfg {
    pub start: StartMode,
    pub poll_ms: u64,
    pub complete_dwell_ms: u64,
    /// 0 disables the READY timeout.
    pub ready_timeout_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            start: StartMode::Auto,
            poll_ms: 100,
            complete_dwell_ms: 1000,
            ready_timeout_ms: 0,
        }
    }
}
