use crossbeam_channel as xch;
use scent_core::mocks::{MemoryStore, RecordingOutbox};
use scent_core::{
    ChannelSource, CommandHandler, ExecState, ExecutionStateMachine, InventoryCfg,
    InventoryLedger, MessageReceiver, MotionPlanner, Outbound, PlannerCfg, RecipeCfg, RunnerCfg,
    Station, StatusKind, run_until,
};
use scent_hardware::{SimulatedIndicator, SimulatedPlate, SimulatedValve};
use scent_traits::ManualClock;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

fn station(outbox: &RecordingOutbox) -> Station {
    let ledger = InventoryLedger::open(
        &InventoryCfg::uniform(12, 500, 500, 50),
        Box::new(MemoryStore::with_rows(&[(1, 500), (3, 500)])),
    )
    .unwrap();
    Station::new(ledger, Arc::new(outbox.clone()))
}

fn wait_until(mut f: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !f() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn receiver_hands_payloads_to_handler_and_reports_close() {
    let outbox = RecordingOutbox::new();
    let st = station(&outbox);
    let (tx, rx) = xch::unbounded();
    let rcv = MessageReceiver::spawn(
        ChannelSource::new(rx),
        CommandHandler::new(st.clone(), RecipeCfg::default()),
        Duration::from_millis(5),
    );
    tx.send(r#"{"CMD":"connect"}"#.to_string()).unwrap();
    tx.send("garbage".to_string()).unwrap();
    tx.send(r#"{"CMD":"manufacture","data":[{"slotId":1,"proportion":20}]}"#.to_string())
        .unwrap();
    drop(tx);
    wait_until(|| rcv.is_closed());
    assert_eq!(rcv.handled(), 3);
    assert_eq!(outbox.messages(), vec![Outbound::Connect]);
    assert!(st.inbox.has_pending());
}

#[test]
fn drop_joins_an_idle_receiver() {
    let outbox = RecordingOutbox::new();
    let st = station(&outbox);
    let (_tx, rx) = xch::unbounded::<String>();
    let rcv = MessageReceiver::spawn(
        ChannelSource::new(rx),
        CommandHandler::new(st, RecipeCfg::default()),
        Duration::from_millis(5),
    );
    assert!(!rcv.is_closed());
    drop(rcv);
}

#[test]
fn receiver_and_runner_complete_a_recipe() {
    let outbox = RecordingOutbox::new();
    let st = station(&outbox);
    let (tx, rx) = xch::unbounded();
    let rcv = MessageReceiver::spawn(
        ChannelSource::new(rx),
        CommandHandler::new(st.clone(), RecipeCfg::default()),
        Duration::from_millis(5),
    );
    let mut machine = ExecutionStateMachine::new(
        SimulatedPlate::new(),
        SimulatedValve::new(),
        SimulatedIndicator::new(),
        st.clone(),
        MotionPlanner::new(PlannerCfg::default()),
        RunnerCfg::default(),
    )
    .with_clock(Arc::new(ManualClock::new()));

    tx.send(
        r#"{"CMD":"manufacture","data":[{"slotId":1,"proportion":20},{"slotId":3,"proportion":10}]}"#
            .to_string(),
    )
    .unwrap();
    drop(tx);

    let shutdown = AtomicBool::new(false);
    let summary = run_until(&mut machine, &shutdown, |m| {
        rcv.is_closed() && m.station().inbox.is_idle() && m.state() == ExecState::Idle
    });
    assert_eq!(summary.completed, 1);
    assert_eq!(st.ledger.query(1), Ok(480));
    assert_eq!(st.ledger.query(3), Ok(490));
    assert_eq!(
        outbox
            .messages()
            .iter()
            .filter_map(Outbound::status)
            .collect::<Vec<_>>(),
        vec![StatusKind::Possible, StatusKind::Complete]
    );
}

#[test]
fn shutdown_flag_stops_runner() {
    let outbox = RecordingOutbox::new();
    let mut machine = ExecutionStateMachine::new(
        SimulatedPlate::new(),
        SimulatedValve::new(),
        SimulatedIndicator::new(),
        station(&outbox),
        MotionPlanner::new(PlannerCfg::default()),
        RunnerCfg::default(),
    )
    .with_clock(Arc::new(ManualClock::new()));
    let shutdown = AtomicBool::new(true);
    let summary = run_until(&mut machine, &shutdown, |_| false);
    assert_eq!(summary.polls, 0);
}
