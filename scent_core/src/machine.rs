//! Execution state machine: IDLE → READY → RUNNING → COMPLETE/ERROR → IDLE.
//!
//! Polled from a single execution context. Inventory is checked and
//! reserved when a recipe is taken from the inbox, so every validation
//! failure is resolved before anything moves. While RUNNING the machine
//! blocks for each planned rotation, dispense and settle; an actuator
//! failure aborts the remaining instructions without retry and releases
//! the reservation, leaving stock untouched.

use crate::bus::{Outbound, StatusKind};
use crate::config::{RunnerCfg, StartMode};
use crate::error::{AbortReason, BlendError};
use crate::hw_error::map_hw_error;
use crate::inventory::ReservationToken;
use crate::planner::{MotionPlanner, Plan};
use crate::recipe::Recipe;
use crate::station::Station;
use crate::status::{ExecState, PollStatus};
use scent_traits::{Clock, Indicator, IndicatorEvent, MonotonicClock, Plate, Valve};
use std::sync::Arc;
use std::time::{Duration, Instant};

type AbortCheck = Box<dyn Fn() -> bool + Send>;

/// A reserved recipe waiting for, or undergoing, execution.
struct Active {
    recipe: Recipe,
    token: ReservationToken,
    ready_at: Instant,
}

pub struct ExecutionStateMachine<P: Plate, V: Valve, I: Indicator> {
    plate: P,
    valve: V,
    indicator: I,
    station: Station,
    planner: MotionPlanner,
    cfg: RunnerCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    abort_check: Option<AbortCheck>,
    state: ExecState,
    active: Option<Active>,
    angle: i64,
}

impl<P: Plate, V: Valve, I: Indicator> std::fmt::Debug for ExecutionStateMachine<P, V, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionStateMachine")
            .field("state", &self.state)
            .field("angle", &self.angle)
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl<P: Plate, V: Valve, I: Indicator> ExecutionStateMachine<P, V, I> {
    pub fn new(
        plate: P,
        valve: V,
        indicator: I,
        station: Station,
        planner: MotionPlanner,
        cfg: RunnerCfg,
    ) -> Self {
        let angle = planner.home_angle();
        Self {
            plate,
            valve,
            indicator,
            station,
            planner,
            cfg,
            clock: Arc::new(MonotonicClock::new()),
            abort_check: None,
            state: ExecState::Idle,
            active: None,
            angle,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    /// Polled between instructions (never mid-step); returning true
    /// abandons the running recipe.
    #[must_use]
    pub fn with_abort_check(mut self, check: impl Fn() -> bool + Send + 'static) -> Self {
        self.abort_check = Some(Box::new(check));
        self
    }

    #[must_use]
    pub fn builder() -> crate::builder::MachineBuilder<P, V, I> {
        crate::builder::MachineBuilder::default()
    }

    #[must_use]
    pub const fn state(&self) -> ExecState {
        self.state
    }

    /// Accumulated plate angle, not wrapped modulo 360.
    #[must_use]
    pub const fn angle(&self) -> i64 {
        self.angle
    }

    #[must_use]
    pub const fn station(&self) -> &Station {
        &self.station
    }

    #[must_use]
    pub const fn cfg(&self) -> &RunnerCfg {
        &self.cfg
    }

    /// Sleep one poll period on the machine's clock.
    pub fn idle_wait(&self) {
        self.clock.sleep(Duration::from_millis(self.cfg.poll_ms));
    }

    fn transition(&mut self, to: ExecState) {
        tracing::debug!(from = %self.state, to = %to, "state transition");
        self.state = to;
    }

    fn publish(&self, status: StatusKind) {
        tracing::info!(status = %status, "status");
        self.station.outbox.publish(Outbound::Status(status));
    }

    /// Advance the lifecycle by one step of the execution context.
    pub fn poll(&mut self) -> PollStatus {
        if self.state == ExecState::Idle {
            let Some(recipe) = self.station.inbox.take() else {
                return PollStatus::Idle;
            };
            self.transition(ExecState::Ready);
            match self.station.ledger.check_and_reserve(&recipe) {
                Ok(token) => {
                    self.publish(StatusKind::Possible);
                    self.indicator.signal(IndicatorEvent::Accepted);
                    self.active = Some(Active {
                        recipe,
                        token,
                        ready_at: self.clock.now(),
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "recipe rejected by inventory check");
                    self.publish(StatusKind::Impossible);
                    self.station.inbox.finish();
                    self.transition(ExecState::Idle);
                    return PollStatus::Rejected(e);
                }
            }
        }

        if self.state != ExecState::Ready {
            return PollStatus::Idle;
        }
        let Some(active) = self.active.take() else {
            self.transition(ExecState::Idle);
            return PollStatus::Idle;
        };

        let go = match self.cfg.start {
            StartMode::Auto => true,
            StartMode::Command => self.station.start.take(),
        };
        if go {
            return self.execute(active);
        }
        if self.cfg.ready_timeout_ms > 0
            && self.clock.ms_since(active.ready_at) >= self.cfg.ready_timeout_ms
        {
            tracing::warn!(
                timeout_ms = self.cfg.ready_timeout_ms,
                "no start command; abandoning recipe"
            );
            return self.abandon(active, BlendError::Abort(AbortReason::StartTimeout));
        }
        self.active = Some(active);
        PollStatus::Waiting
    }

    /// Drop a READY recipe that will never be started. Returns false when
    /// nothing was waiting.
    pub fn cancel_ready(&mut self) -> bool {
        match (self.state, self.active.take()) {
            (ExecState::Ready, Some(active)) => {
                self.abandon(active, BlendError::Abort(AbortReason::Cancelled));
                true
            }
            (_, active) => {
                self.active = active;
                false
            }
        }
    }

    fn execute(&mut self, active: Active) -> PollStatus {
        self.transition(ExecState::Running);
        self.indicator.signal(IndicatorEvent::Running);
        // the error path parks the plate at home; a failed park is logged there
        self.angle = self.planner.home_angle();
        let plan = self.planner.plan(self.angle, &active.recipe.sequence());
        tracing::info!(
            instructions = plan.instructions.len(),
            total_ms = plan.total_ms(),
            "recipe started"
        );

        match self.run_plan(&plan) {
            Ok(()) => {
                self.transition(ExecState::Complete);
                match self.station.ledger.commit(active.token) {
                    Ok(()) => {}
                    Err(BlendError::Persistence(e)) => {
                        tracing::error!(error = %e, "inventory commit not persisted; in-memory stock stays authoritative");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "inventory commit rejected");
                        return self.fail(None, e);
                    }
                }
                self.indicator.signal(IndicatorEvent::Complete);
                self.publish(StatusKind::Complete);
                self.clock
                    .sleep(Duration::from_millis(self.cfg.complete_dwell_ms));
                self.station.inbox.finish();
                self.transition(ExecState::Idle);
                PollStatus::Completed
            }
            Err(e) => {
                tracing::error!(error = %e, angle = self.angle, "recipe aborted");
                if let Err(close) = self.valve.close() {
                    tracing::warn!(error = %close, "valve close after fault failed");
                }
                self.park();
                self.abandon(active, e)
            }
        }
    }

    /// Best-effort rotation back to the home angle after an interrupted plan.
    fn park(&mut self) {
        let delta = self.planner.home_angle() - self.angle;
        if delta == 0 {
            return;
        }
        let moved = self.plate.rotate(delta).and_then(|()| {
            self.clock
                .sleep(Duration::from_millis(self.planner.rotate_ms(delta)));
            self.plate.hold()
        });
        match moved {
            Ok(()) => self.angle += delta,
            Err(e) => tracing::warn!(
                error = %e,
                angle = self.angle,
                "return to home failed; plate position unknown"
            ),
        }
    }

    fn abandon(&mut self, active: Active, err: BlendError) -> PollStatus {
        self.fail(Some(active.token), err)
    }

    /// ERROR path shared by faults, aborts, start timeouts and rejected commits.
    fn fail(&mut self, token: Option<ReservationToken>, err: BlendError) -> PollStatus {
        self.transition(ExecState::Error);
        if let Some(Err(e)) = token.map(|t| self.station.ledger.release(t)) {
            tracing::error!(error = %e, "reservation release failed");
        }
        self.indicator.signal(IndicatorEvent::Fault);
        self.publish(StatusKind::Error);
        self.station.inbox.finish();
        self.transition(ExecState::Idle);
        PollStatus::Failed(err)
    }

    fn aborted(&self) -> bool {
        self.abort_check.as_ref().is_some_and(|f| f())
    }

    fn run_plan(&mut self, plan: &Plan) -> Result<(), BlendError> {
        for (idx, ins) in plan.instructions.iter().enumerate() {
            if self.aborted() {
                return Err(BlendError::Abort(AbortReason::Cancelled));
            }
            tracing::debug!(
                step = idx,
                slot_id = ?ins.slot_id,
                delta_deg = ins.rotate_delta_degrees,
                rotate_ms = ins.rotate_duration_ms,
                dispense_ms = ins.dispense_duration_ms,
                "instruction"
            );

            if ins.rotate_delta_degrees != 0 {
                self.plate
                    .rotate(ins.rotate_delta_degrees)
                    .map_err(|e| map_hw_error(&*e))?;
                self.clock
                    .sleep(Duration::from_millis(ins.rotate_duration_ms));
                self.plate.hold().map_err(|e| map_hw_error(&*e))?;
                self.angle += ins.rotate_delta_degrees;
            }

            if ins.dispenses() && ins.dispense_duration_ms > 0 {
                self.valve.open().map_err(|e| map_hw_error(&*e))?;
                self.clock
                    .sleep(Duration::from_millis(ins.dispense_duration_ms));
                self.valve.close().map_err(|e| map_hw_error(&*e))?;
                self.clock
                    .sleep(Duration::from_millis(ins.settle_duration_ms));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InventoryCfg, PlannerCfg};
    use crate::inventory::InventoryLedger;
    use crate::mocks::{MemoryStore, RecordingOutbox};
    use crate::recipe::Step;
    use scent_hardware::{SimulatedIndicator, SimulatedPlate, SimulatedValve};
    use scent_traits::ManualClock;

    #[test]
    fn rejected_commit_ends_in_error_not_complete() {
        let outbox = RecordingOutbox::new();
        let ledger = InventoryLedger::open(
            &InventoryCfg::uniform(12, 500, 500, 50),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        let station = Station::new(ledger, Arc::new(outbox.clone()));
        let clock = Arc::new(ManualClock::new());
        let mut m = ExecutionStateMachine::new(
            SimulatedPlate::new(),
            SimulatedValve::new(),
            SimulatedIndicator::new(),
            station,
            MotionPlanner::new(PlannerCfg::default()),
            RunnerCfg::default(),
        )
        .with_clock(clock.clone());

        // a token the ledger never issued
        let active = Active {
            recipe: Recipe::new(vec![Step::new(1, 20)], None, 20).unwrap(),
            token: ReservationToken::unissued(u64::MAX),
            ready_at: clock.now(),
        };
        let status = m.execute(active);
        assert!(matches!(
            status,
            PollStatus::Failed(BlendError::Ledger(
                crate::error::LedgerError::UnknownReservation
            ))
        ));
        assert_eq!(m.station().ledger.query(1), Ok(500));
        assert_eq!(outbox.statuses(), vec![StatusKind::Error]);
        assert_eq!(m.state(), ExecState::Idle);
    }
}
