use rstest::rstest;
use scent_hardware::error::HwError;
use scent_hardware::{SimulatedIndicator, SimulatedPlate, SimulatedValve};
use scent_traits::{Indicator, IndicatorEvent, Plate, Valve};

#[rstest]
#[case(0)]
#[case(2)]
fn plate_fault_is_typed_and_stops_accumulation(#[case] fail_at: usize) {
    let handle = SimulatedPlate::new();
    let mut plate = handle.clone();
    handle.fail_on_move(fail_at);
    for _ in 0..fail_at {
        plate.rotate(30).expect("move before fault");
    }
    let err = plate.rotate(30).expect_err("injected fault");
    match err.downcast_ref::<HwError>() {
        Some(HwError::Fault(msg)) => assert!(msg.contains("jammed")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(handle.angle(), 30 * fail_at as i64);
}

#[test]
fn valve_open_close_cycle() {
    let handle = SimulatedValve::new();
    let mut valve = handle.clone();
    for _ in 0..3 {
        valve.open().unwrap();
        assert!(handle.is_open());
        valve.close().unwrap();
        assert!(!handle.is_open());
    }
    assert_eq!(handle.open_count(), 3);
}

#[test]
fn indicator_records_in_order() {
    let handle = SimulatedIndicator::new();
    let mut led = handle.clone();
    led.signal(IndicatorEvent::Accepted);
    led.signal(IndicatorEvent::Running);
    led.signal(IndicatorEvent::Complete);
    assert_eq!(
        handle.events(),
        vec![
            IndicatorEvent::Accepted,
            IndicatorEvent::Running,
            IndicatorEvent::Complete
        ]
    );
}
