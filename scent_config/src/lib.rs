#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and slot-table parsing for the blending rig.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The slot-table CSV loader enforces headers and rejects duplicate or
//!   zero slot identifiers, so ingredient metadata is a lookup table
//!   rather than a branch in the manufacturing code.
use serde::Deserialize;

/// One row of the slot table.
///
/// CSV headers:
/// slot,ingredient,max_ml,min_threshold_ml
///
/// Example:
/// slot,ingredient,max_ml,min_threshold_ml
/// 1,lavender,500,50
/// 12,ethanol,2000,
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SlotRow {
    pub slot: u32,
    pub ingredient: String,
    /// Overrides `inventory.max_ml` for this slot.
    #[serde(default)]
    pub max_ml: Option<u32>,
    /// Overrides `inventory.min_threshold_ml` for this slot.
    #[serde(default)]
    pub min_threshold_ml: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    /// GPIO line driving the status LED
    pub led: u8,
    pub i2c_bus: u8,
    /// PCA9685 address on the I2C bus
    pub pca9685_addr: u16,
    pub plate_channel: u8,
    pub valve_channel: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            led: 19,
            i2c_bus: 1,
            pca9685_addr: 0x60,
            plate_channel: 0,
            valve_channel: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlateCfg {
    /// Degrees between adjacent slot positions
    pub angle_per_slot: i64,
    /// Rotation time per degree of travel
    pub ms_per_degree: u64,
    /// Slot under the valve when the plate is at rest
    pub home_slot: u32,
    /// Plate angle at rest
    pub home_angle: i64,
}

impl Default for PlateCfg {
    fn default() -> Self {
        Self {
            angle_per_slot: 30,
            ms_per_degree: 10,
            home_slot: 2,
            home_angle: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    /// duration = proportion * ms_per_proportion_unit
    #[default]
    Linear,
    /// duration = (proportion * drops_per_unit_x10 / 10) * ms_per_drop
    Drops,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ValveCfg {
    pub curve: CurveKind,
    pub ms_per_proportion_unit: u64,
    /// Drops per proportion unit, times ten (20 = two drops per unit)
    pub drops_per_unit_x10: u64,
    pub ms_per_drop: u64,
    /// Dwell after each dispense for residual drops
    pub settle_ms: u64,
    pub open_angle: i32,
    pub closed_angle: i32,
    pub rest_angle: i32,
}

impl Default for ValveCfg {
    fn default() -> Self {
        Self {
            curve: CurveKind::Linear,
            ms_per_proportion_unit: 15,
            drops_per_unit_x10: 20,
            ms_per_drop: 300,
            settle_ms: 500,
            open_angle: 80,
            closed_angle: 0,
            rest_angle: 15,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InventoryCfg {
    /// Persisted stock file ("<id> <ml>" per line)
    pub path: String,
    /// Number of reservoir slots; ids are 1..=slot_count
    pub slot_count: u32,
    /// Stock written for every slot when no file exists yet
    pub default_capacity_ml: u32,
    pub max_ml: u32,
    pub min_threshold_ml: u32,
}

impl Default for InventoryCfg {
    fn default() -> Self {
        Self {
            path: "base_storage.txt".into(),
            slot_count: 12,
            default_capacity_ml: 500,
            max_ml: 500,
            min_threshold_ml: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecipeCfg {
    /// Proportion used for the carrier (diluent) step appended to every recipe
    pub carrier_proportion: u32,
    /// Operator proportions are divided by this before use (1 = as sent)
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

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    /// Start as soon as the inventory check passes
    #[default]
    Auto,
    /// Wait for an explicit "start" command
    Command,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    pub start: StartMode,
    /// Execution-context poll period
    pub poll_ms: u64,
    /// Dwell after a completed recipe before returning to idle
    pub complete_dwell_ms: u64,
    /// Give up on a READY recipe after this long without a start command (0 disables)
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pins: Pins,
    #[serde(default)]
    pub plate: PlateCfg,
    #[serde(default)]
    pub valve: ValveCfg,
    #[serde(default)]
    pub inventory: InventoryCfg,
    /// Optional per-slot metadata; slots not listed use inventory defaults.
    #[serde(default)]
    pub slots: Vec<SlotRow>,
    #[serde(default)]
    pub recipe: RecipeCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_slot_table_csv(path: &std::path::Path) -> eyre::Result<Vec<SlotRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open slot table {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["slot", "ingredient", "max_ml", "min_threshold_ml"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "slot table CSV must have headers 'slot,ingredient,max_ml,min_threshold_ml', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<SlotRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    validate_slot_rows(&rows, None)?;
    Ok(rows)
}

fn validate_slot_rows(rows: &[SlotRow], slot_count: Option<u32>) -> eyre::Result<()> {
    let mut seen = std::collections::BTreeSet::new();
    for row in rows {
        if row.slot == 0 {
            eyre::bail!("slot ids start at 1 (ingredient '{}')", row.ingredient);
        }
        if let Some(n) = slot_count.filter(|n| row.slot > *n) {
            eyre::bail!("slot {} exceeds inventory.slot_count ({n})", row.slot);
        }
        if !seen.insert(row.slot) {
            eyre::bail!("slot {} listed more than once", row.slot);
        }
        if row.ingredient.trim().is_empty() {
            eyre::bail!("slot {} has an empty ingredient name", row.slot);
        }
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Plate
        if self.plate.angle_per_slot == 0 {
            eyre::bail!("plate.angle_per_slot must be non-zero");
        }
        if self.plate.angle_per_slot.unsigned_abs() > 360 {
            eyre::bail!("plate.angle_per_slot must be within [-360, 360]");
        }
        if self.plate.home_slot == 0 || self.plate.home_slot > self.inventory.slot_count {
            eyre::bail!(
                "plate.home_slot must be in 1..={}",
                self.inventory.slot_count
            );
        }

        // Valve
        match self.valve.curve {
            CurveKind::Linear if self.valve.ms_per_proportion_unit == 0 => {
                eyre::bail!("valve.ms_per_proportion_unit must be >= 1 for the linear curve");
            }
            CurveKind::Drops
                if self.valve.drops_per_unit_x10 == 0 || self.valve.ms_per_drop == 0 =>
            {
                eyre::bail!("valve.drops_per_unit_x10 and valve.ms_per_drop must be >= 1");
            }
            _ => {}
        }
        if self.valve.settle_ms > 60_000 {
            eyre::bail!("valve.settle_ms is unreasonably large (>60s)");
        }
        for (name, angle) in [
            ("open_angle", self.valve.open_angle),
            ("closed_angle", self.valve.closed_angle),
            ("rest_angle", self.valve.rest_angle),
        ] {
            if !(0..=180).contains(&angle) {
                eyre::bail!("valve.{name} must be in [0, 180]");
            }
        }

        // Inventory
        if self.inventory.slot_count == 0 {
            eyre::bail!("inventory.slot_count must be >= 1");
        }
        if self.inventory.path.trim().is_empty() {
            eyre::bail!("inventory.path must not be empty");
        }
        if self.inventory.default_capacity_ml > self.inventory.max_ml {
            eyre::bail!("inventory.default_capacity_ml must be <= inventory.max_ml");
        }
        if self.inventory.min_threshold_ml > self.inventory.max_ml {
            eyre::bail!("inventory.min_threshold_ml must be <= inventory.max_ml");
        }
        validate_slot_rows(&self.slots, Some(self.inventory.slot_count))?;

        // Recipe
        if self.recipe.proportion_divisor == 0 {
            eyre::bail!("recipe.proportion_divisor must be >= 1");
        }
        if self.recipe.carrier_proportion > 100 {
            eyre::bail!("recipe.carrier_proportion must be in [0, 100]");
        }
        if self.recipe.max_steps == 0 {
            eyre::bail!("recipe.max_steps must be >= 1");
        }

        // Runner
        if self.runner.poll_ms == 0 {
            eyre::bail!("runner.poll_ms must be >= 1");
        }
        if self.runner.complete_dwell_ms > 5 * 60 * 1000 {
            eyre::bail!("runner.complete_dwell_ms is unreasonably large (>5min)");
        }

        Ok(())
    }
}
