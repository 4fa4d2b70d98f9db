use scent_core::mocks::{MemoryStore, RecordingOutbox};
use scent_core::{
    AbortReason, BlendError, BuildError, CommandHandler, ExecState, ExecutionStateMachine, InventoryCfg,
    InventoryLedger, LedgerError, PlannerCfg, PollStatus, Recipe, RecipeCfg, RunnerCfg, StartMode, Station,
    StatusKind, Step,
};
use scent_hardware::{SimulatedIndicator, SimulatedPlate, SimulatedValve};
use scent_traits::{IndicatorEvent, ManualClock};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Machine = ExecutionStateMachine<SimulatedPlate, SimulatedValve, SimulatedIndicator>;

struct Rig {
    machine: Machine,
    plate: SimulatedPlate,
    valve: SimulatedValve,
    indicator: SimulatedIndicator,
    outbox: RecordingOutbox,
    store: MemoryStore,
    clock: ManualClock,
}

fn rig(rows: &[(u32, u32)], runner: RunnerCfg) -> Rig {
    let store = MemoryStore::with_rows(rows);
    let ledger = InventoryLedger::open(
        &InventoryCfg::uniform(12, 500, 500, 50),
        Box::new(store.clone()),
    )
    .unwrap();
    let outbox = RecordingOutbox::new();
    let station = Station::new(ledger, Arc::new(outbox.clone()));
    let (plate, valve, indicator) = (
        SimulatedPlate::new(),
        SimulatedValve::new(),
        SimulatedIndicator::new(),
    );
    let clock = ManualClock::new();
    let machine = Machine::builder()
        .with_plate(plate.clone())
        .with_valve(valve.clone())
        .with_indicator(indicator.clone())
        .with_station(station)
        .with_planner(PlannerCfg::default())
        .with_runner(runner)
        .with_clock(Arc::new(clock.clone()))
        .try_build()
        .unwrap();
    Rig {
        machine,
        plate,
        valve,
        indicator,
        outbox,
        store,
        clock,
    }
}

fn submit(m: &Machine, steps: &[(u32, u32)]) {
    let r = Recipe::new(
        steps.iter().map(|&(s, p)| Step::new(s, p)).collect(),
        None,
        20,
    )
    .unwrap();
    m.station().inbox.submit(r).unwrap();
}

fn handler(m: &Machine) -> CommandHandler {
    CommandHandler::new(m.station().clone(), RecipeCfg::default())
}

#[test]
fn end_to_end_complete_then_impossible() {
    let mut r = rig(&[(1, 500), (3, 500)], RunnerCfg::default());
    submit(&r.machine, &[(1, 20), (3, 10)]);
    assert!(matches!(r.machine.poll(), PollStatus::Completed));
    assert_eq!(r.machine.state(), ExecState::Idle);
    let ledger = &r.machine.station().ledger;
    assert_eq!(ledger.query(1), Ok(480));
    assert_eq!(ledger.query(3), Ok(490));
    assert_eq!(
        r.outbox.statuses(),
        vec![StatusKind::Possible, StatusKind::Complete]
    );
    assert!(r.store.rows().unwrap().contains(&(1, 480)));

    let mut r = rig(&[(1, 10)], RunnerCfg::default());
    submit(&r.machine, &[(1, 20), (3, 10)]);
    assert!(matches!(
        r.machine.poll(),
        PollStatus::Rejected(LedgerError::InsufficientStock {
            slot_id: 1,
            required: 20,
            available: 10
        })
    ));
    assert_eq!(r.machine.station().ledger.query(1), Ok(10));
    assert_eq!(r.outbox.statuses(), vec![StatusKind::Impossible]);
    assert!(r.plate.moves().is_empty());
    assert_eq!(r.valve.open_count(), 0);
    assert!(r.machine.station().inbox.is_idle());
}

#[test]
fn actuators_follow_the_plan() {
    let mut r = rig(&[], RunnerCfg::default());
    submit(&r.machine, &[(3, 10), (1, 10), (4, 10)]);
    assert!(matches!(r.machine.poll(), PollStatus::Completed));
    assert_eq!(r.plate.moves(), vec![30, -60, 90, -60]);
    assert_eq!(r.plate.angle(), 0);
    assert_eq!(r.machine.angle(), 60);
    assert_eq!(r.valve.open_count(), 3);
    assert!(!r.valve.is_open());
    assert_eq!(
        r.indicator.events(),
        vec![
            IndicatorEvent::Accepted,
            IndicatorEvent::Running,
            IndicatorEvent::Complete
        ]
    );
    // rotations 300+600+900+600, three 150 ms dispenses, three settles, dwell
    let expected = 2400 + 3 * 150 + 3 * 500 + 1000;
    assert_eq!(r.clock.elapsed(), Duration::from_millis(expected));
}

#[test]
fn valve_fault_aborts_and_releases_reservation() {
    let mut r = rig(&[(1, 500), (3, 500)], RunnerCfg::default());
    r.valve.fail_on_open(1);
    submit(&r.machine, &[(1, 20), (3, 10), (1, 5)]);
    let status = r.machine.poll();
    assert!(matches!(status, PollStatus::Failed(BlendError::ActuatorFault(ref m)) if m.contains("valve stuck")));
    assert_eq!(r.valve.open_count(), 1);
    assert!(!r.valve.is_open());
    // the plan stopped at slot 3; the plate is parked back at home
    assert_eq!(r.plate.moves(), vec![-30, 60, -30]);
    assert_eq!(r.plate.angle(), 0);
    assert_eq!(r.machine.angle(), 60);
    let ledger = &r.machine.station().ledger;
    assert_eq!(ledger.query(1), Ok(500));
    assert_eq!(ledger.query(3), Ok(500));
    assert!(!ledger.has_outstanding());
    assert_eq!(
        r.outbox.statuses(),
        vec![StatusKind::Possible, StatusKind::Error]
    );
    assert_eq!(r.indicator.events().last(), Some(&IndicatorEvent::Fault));
    assert_eq!(r.machine.state(), ExecState::Idle);

    // the rig accepts the next recipe
    submit(&r.machine, &[(3, 10)]);
    assert!(matches!(r.machine.poll(), PollStatus::Completed));
    assert_eq!(r.machine.station().ledger.query(3), Ok(490));
}

#[test]
fn plate_fault_is_reported_as_error() {
    let mut r = rig(&[], RunnerCfg::default());
    r.plate.fail_on_move(0);
    submit(&r.machine, &[(4, 10)]);
    assert!(matches!(
        r.machine.poll(),
        PollStatus::Failed(BlendError::ActuatorFault(_))
    ));
    assert_eq!(r.valve.open_count(), 0);
    // nothing moved, so there is nothing to undo
    assert!(r.plate.moves().is_empty());
    assert_eq!(r.machine.station().ledger.query(4), Ok(500));
}

#[test]
fn command_mode_waits_for_start() {
    let runner = RunnerCfg {
        start: StartMode::Command,
        ..RunnerCfg::default()
    };
    let mut r = rig(&[], runner);
    let h = handler(&r.machine);
    // a start sent before the manufacture request is ignored
    h.handle(r#"{"CMD":"start"}"#).unwrap();
    h.handle(r#"{"CMD":"manufacture","data":[{"slotId":2,"proportion":10}]}"#)
        .unwrap();
    assert!(matches!(r.machine.poll(), PollStatus::Waiting));
    assert_eq!(r.machine.state(), ExecState::Ready);
    assert!(matches!(r.machine.poll(), PollStatus::Waiting));
    assert_eq!(r.valve.open_count(), 0);

    r.machine.station().start.fire();
    assert!(matches!(r.machine.poll(), PollStatus::Completed));
    assert_eq!(r.machine.station().ledger.query(2), Ok(490));
}

#[test]
fn start_handled_before_the_next_poll_is_kept() {
    let runner = RunnerCfg {
        start: StartMode::Command,
        ..RunnerCfg::default()
    };
    let mut r = rig(&[(1, 500)], runner);
    let h = handler(&r.machine);
    h.handle(r#"{"CMD":"manufacture","data":[{"slotId":1,"proportion":20}]}"#)
        .unwrap();
    h.handle(r#"{"CMD":"start"}"#).unwrap();
    assert!(matches!(r.machine.poll(), PollStatus::Completed));
    assert_eq!(r.machine.station().ledger.query(1), Ok(480));
    assert!(r.machine.station().inbox.is_idle());
    assert_eq!(
        r.outbox.statuses(),
        vec![StatusKind::Possible, StatusKind::Complete]
    );
}

#[test]
fn start_for_the_recipe_in_flight_survives_a_rejected_submit() {
    let runner = RunnerCfg {
        start: StartMode::Command,
        ..RunnerCfg::default()
    };
    let mut r = rig(&[], runner);
    let h = handler(&r.machine);
    h.handle(r#"{"CMD":"manufacture","data":[{"slotId":2,"proportion":10}]}"#)
        .unwrap();
    assert!(matches!(r.machine.poll(), PollStatus::Waiting));
    h.handle(r#"{"CMD":"start"}"#).unwrap();
    // busy: rejected, and must not swallow the pending start
    assert!(
        h.handle(r#"{"CMD":"manufacture","data":[{"slotId":3,"proportion":10}]}"#)
            .is_err()
    );
    assert!(matches!(r.machine.poll(), PollStatus::Completed));
    assert_eq!(r.machine.station().ledger.query(2), Ok(490));
    assert_eq!(r.machine.station().ledger.query(3), Ok(500));
}

#[test]
fn ready_timeout_abandons_recipe() {
    let runner = RunnerCfg {
        start: StartMode::Command,
        ready_timeout_ms: 1_000,
        ..RunnerCfg::default()
    };
    let mut r = rig(&[], runner);
    submit(&r.machine, &[(2, 10)]);
    assert!(matches!(r.machine.poll(), PollStatus::Waiting));
    r.clock.advance(Duration::from_millis(999));
    assert!(matches!(r.machine.poll(), PollStatus::Waiting));
    r.clock.advance(Duration::from_millis(1));
    assert!(matches!(
        r.machine.poll(),
        PollStatus::Failed(BlendError::Abort(AbortReason::StartTimeout))
    ));
    assert!(!r.machine.station().ledger.has_outstanding());
    assert_eq!(
        r.outbox.statuses(),
        vec![StatusKind::Possible, StatusKind::Error]
    );
}

#[test]
fn cancel_ready_releases_the_reservation() {
    let runner = RunnerCfg {
        start: StartMode::Command,
        ..RunnerCfg::default()
    };
    let mut r = rig(&[], runner);
    assert!(!r.machine.cancel_ready());
    submit(&r.machine, &[(2, 10)]);
    assert!(matches!(r.machine.poll(), PollStatus::Waiting));
    assert!(r.machine.cancel_ready());
    assert_eq!(r.machine.state(), ExecState::Idle);
    assert!(r.machine.station().inbox.is_idle());
    assert!(!r.machine.station().ledger.has_outstanding());
}

#[test]
fn abort_hook_stops_between_instructions() {
    let mut r = rig(&[], RunnerCfg::default());
    let checks = Arc::new(AtomicUsize::new(0));
    let c = checks.clone();
    // lets the first instruction run, then asks to stop
    r.machine = r
        .machine
        .with_abort_check(move || c.fetch_add(1, Ordering::Relaxed) >= 1);
    submit(&r.machine, &[(1, 10), (3, 10)]);
    assert!(matches!(
        r.machine.poll(),
        PollStatus::Failed(BlendError::Abort(AbortReason::Cancelled))
    ));
    assert_eq!(r.plate.moves(), vec![-30, 30]);
    assert_eq!(r.valve.open_count(), 1);
    assert_eq!(checks.load(Ordering::Relaxed), 2);
    assert_eq!(r.machine.station().ledger.query(1), Ok(500));
    assert!(!r.machine.station().ledger.has_outstanding());
}

#[test]
fn persistence_fault_on_commit_still_completes() {
    let mut r = rig(&[(1, 500)], RunnerCfg::default());
    r.store.set_failing(true);
    submit(&r.machine, &[(1, 20)]);
    assert!(matches!(r.machine.poll(), PollStatus::Completed));
    assert_eq!(r.machine.station().ledger.query(1), Ok(480));
    assert_eq!(
        r.outbox.statuses(),
        vec![StatusKind::Possible, StatusKind::Complete]
    );
}

#[test]
fn builder_reports_missing_parts() {
    let err = Machine::builder()
        .with_plate(SimulatedPlate::new())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingValve));
}
