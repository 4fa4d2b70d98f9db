//! One-shot subcommands: `inventory`, `plan`, `self-check`.

use std::sync::Arc;

use scent_core::error::{BlendError, Result as CoreResult};
use scent_core::mocks::{MemoryStore, RecordingOutbox};
use scent_core::{
    CommandHandler, ExecutionStateMachine, InventoryCfg, InventoryLedger, MotionPlanner,
    PlannerCfg, PollStatus, RecipeCfg, RunnerCfg, Station, StatusKind,
};
use scent_traits::ManualClock;
use serde_json::json;

use crate::serve::open_ledger;

/// Print stock per slot. Creates the stock file with defaults if absent,
/// exactly as `run` would.
pub fn inventory(cfg: &scent_config::Config, json_out: bool) -> CoreResult<()> {
    let ledger = open_ledger(cfg)?;
    for item in ledger.snapshot() {
        let name = ledger.ingredient(item.id).unwrap_or("-");
        if json_out {
            println!(
                "{}",
                json!({
                    "slot": item.id,
                    "ingredient": name,
                    "current_ml": item.current_ml,
                    "max_ml": item.max_ml,
                    "min_threshold_ml": item.min_threshold_ml,
                    "low": item.is_low(),
                })
            );
        } else {
            println!(
                "slot {:>2}  {:<16} {:>5} / {:<5} ml{}",
                item.id,
                name,
                item.current_ml,
                item.max_ml,
                if item.is_low() { "  LOW" } else { "" }
            );
        }
    }
    Ok(())
}

/// Print the instruction plan for a recipe, starting from the home angle.
pub fn plan(
    cfg: &scent_config::Config,
    slots: &[u32],
    props: &[u32],
    carrier: Option<u32>,
    json_out: bool,
) -> CoreResult<()> {
    if slots.len() != props.len() {
        eyre::bail!(
            "--slots has {} entries but --props has {}",
            slots.len(),
            props.len()
        );
    }
    // Reuse the manufacture path so scaling and validation match `run`.
    let handler = CommandHandler::new(
        Station::new(
            InventoryLedger::open(&InventoryCfg::from(cfg), Box::new(MemoryStore::new()))?,
            Arc::new(RecordingOutbox::new()),
        ),
        RecipeCfg::from(&cfg.recipe),
    );
    let pairs: Vec<(u32, u32)> = slots.iter().copied().zip(props.iter().copied()).collect();
    let recipe = handler.build_recipe(&pairs, carrier)?;

    let planner = MotionPlanner::new(PlannerCfg::from(cfg));
    let plan = planner.plan(planner.home_angle(), &recipe.sequence());
    for (idx, ins) in plan.instructions.iter().enumerate() {
        if json_out {
            println!(
                "{}",
                json!({
                    "step": idx,
                    "slot": ins.slot_id,
                    "rotate_deg": ins.rotate_delta_degrees,
                    "rotate_ms": ins.rotate_duration_ms,
                    "dispense_ms": ins.dispense_duration_ms,
                    "settle_ms": ins.settle_duration_ms,
                })
            );
        } else {
            let slot = ins
                .slot_id
                .map_or_else(|| "home".to_string(), |s| format!("slot {s}"));
            println!(
                "{idx:>2}: {slot:<8} rotate {:>+5} deg ({:>5} ms)  dispense {:>5} ms  settle {:>4} ms",
                ins.rotate_delta_degrees,
                ins.rotate_duration_ms,
                ins.dispense_duration_ms,
                ins.settle_duration_ms
            );
        }
    }
    if json_out {
        println!(
            "{}",
            json!({ "total_ms": plan.total_ms(), "final_angle": plan.final_angle })
        );
    } else {
        println!(
            "total {} ms, final angle {} deg",
            plan.total_ms(),
            plan.final_angle
        );
    }
    Ok(())
}

/// Drive a built-in recipe through the whole pipeline on simulated
/// actuators, in-memory stock and a manual clock.
pub fn self_check(cfg: &scent_config::Config) -> CoreResult<()> {
    #[cfg(feature = "hardware")]
    {
        let p = &cfg.pins;
        let v = &cfg.valve;
        let _rig = scent_hardware::open_servo_rig(
            p.i2c_bus,
            p.pca9685_addr,
            p.plate_channel,
            p.valve_channel,
            (v.open_angle, v.closed_angle, v.rest_angle),
        )?;
        let _led = scent_hardware::LedIndicator::new(p.led)?;
        tracing::info!(addr = p.pca9685_addr, led = p.led, "hardware present");
    }

    let inv = InventoryCfg::from(cfg);
    let slots: Vec<u32> = inv.slots.iter().map(|s| s.id).take(2).collect();
    let outbox = RecordingOutbox::new();
    let ledger = InventoryLedger::open(&inv, Box::new(MemoryStore::new()))?;
    let station = Station::new(ledger, Arc::new(outbox.clone()));
    let handler = CommandHandler::new(station.clone(), RecipeCfg::from(&cfg.recipe));

    let data: Vec<serde_json::Value> = slots
        .iter()
        .map(|s| json!({ "slotId": s, "proportion": 5 * cfg.recipe.proportion_divisor }))
        .collect();
    handler.handle(&json!({ "CMD": "manufacture", "data": data }).to_string())?;

    let before: Vec<u32> = slots
        .iter()
        .map(|&s| station.ledger.query(s))
        .collect::<Result<_, _>>()?;
    let runner = RunnerCfg {
        start: scent_core::StartMode::Auto,
        ..RunnerCfg::from(&cfg.runner)
    };
    let mut machine = ExecutionStateMachine::new(
        scent_hardware::SimulatedPlate::new(),
        scent_hardware::SimulatedValve::new(),
        scent_hardware::SimulatedIndicator::new(),
        station.clone(),
        MotionPlanner::new(PlannerCfg::from(cfg)),
        runner,
    )
    .with_clock(Arc::new(ManualClock::new()));

    match machine.poll() {
        PollStatus::Completed => {}
        PollStatus::Failed(e) => return Err(e.into()),
        PollStatus::Rejected(e) => return Err(BlendError::from(e).into()),
        other => eyre::bail!("self-check recipe did not run: {other:?}"),
    }
    for (&slot, prev) in slots.iter().zip(before) {
        let now = station.ledger.query(slot)?;
        if now + 5 != prev {
            eyre::bail!("self-check: slot {slot} went from {prev} to {now} ml, expected -5");
        }
    }
    if outbox.statuses() != [StatusKind::Possible, StatusKind::Complete] {
        eyre::bail!("self-check: unexpected status sequence {:?}", outbox.statuses());
    }
    println!("self-check ok");
    Ok(())
}
