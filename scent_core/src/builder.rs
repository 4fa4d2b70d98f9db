//! Builder for `ExecutionStateMachine`.
//!
//! Collects actuators, wiring and configuration, then validates the
//! combination in `try_build()`.

use std::sync::Arc;

use scent_traits::{Clock, Indicator, Plate, Valve};

use crate::config::{PlannerCfg, RunnerCfg};
use crate::error::BuildError;
use crate::machine::ExecutionStateMachine;
use crate::planner::MotionPlanner;
use crate::station::Station;

pub struct MachineBuilder<P, V, I> {
    plate: Option<P>,
    valve: Option<V>,
    indicator: Option<I>,
    station: Option<Station>,
    planner: PlannerCfg,
    runner: RunnerCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    abort_check: Option<Box<dyn Fn() -> bool + Send>>,
}

impl<P, V, I> Default for MachineBuilder<P, V, I> {
    fn default() -> Self {
        Self {
            plate: None,
            valve: None,
            indicator: None,
            station: None,
            planner: PlannerCfg::default(),
            runner: RunnerCfg::default(),
            clock: None,
            abort_check: None,
        }
    }
}

impl<P: Plate, V: Valve, I: Indicator> MachineBuilder<P, V, I> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_plate(mut self, plate: P) -> Self {
        self.plate = Some(plate);
        self
    }

    #[must_use]
    pub fn with_valve(mut self, valve: V) -> Self {
        self.valve = Some(valve);
        self
    }

    #[must_use]
    pub fn with_indicator(mut self, indicator: I) -> Self {
        self.indicator = Some(indicator);
        self
    }

    #[must_use]
    pub fn with_station(mut self, station: Station) -> Self {
        self.station = Some(station);
        self
    }

    #[must_use]
    pub const fn with_planner(mut self, cfg: PlannerCfg) -> Self {
        self.planner = cfg;
        self
    }

    #[must_use]
    pub const fn with_runner(mut self, cfg: RunnerCfg) -> Self {
        self.runner = cfg;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn with_abort_check(mut self, check: impl Fn() -> bool + Send + 'static) -> Self {
        self.abort_check = Some(Box::new(check));
        self
    }

    pub fn try_build(self) -> Result<ExecutionStateMachine<P, V, I>, BuildError> {
        let plate = self.plate.ok_or(BuildError::MissingPlate)?;
        let valve = self.valve.ok_or(BuildError::MissingValve)?;
        let indicator = self.indicator.ok_or(BuildError::MissingIndicator)?;
        let station = self.station.ok_or(BuildError::MissingStation)?;
        if self.planner.angle_per_slot == 0 {
            return Err(BuildError::InvalidConfig("angle_per_slot must be non-zero"));
        }
        if self.planner.home_slot == 0 {
            return Err(BuildError::InvalidConfig("home_slot must be >= 1"));
        }
        if self.runner.poll_ms == 0 {
            return Err(BuildError::InvalidConfig("poll_ms must be >= 1"));
        }

        let mut machine = ExecutionStateMachine::new(
            plate,
            valve,
            indicator,
            station,
            MotionPlanner::new(self.planner),
            self.runner,
        );
        if let Some(clock) = self.clock {
            machine = machine.with_clock(clock);
        }
        if let Some(check) = self.abort_check {
            machine = machine.with_abort_check(check);
        }
        Ok(machine)
    }
}
