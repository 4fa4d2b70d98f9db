//! `run`: serve command envelopes against the rig.
//!
//! stdin (or `--input`) is read as JSON lines on a reader thread and fed to
//! the reception thread; outbound envelopes are printed to stdout as JSON
//! lines by a writer thread. The execution context runs on this thread.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::WrapErr;
use scent_core::error::Result as CoreResult;
use scent_core::{
    ChannelOutbox, ChannelSource, CommandHandler, ExecState, ExecutionStateMachine, FileStore,
    InventoryCfg, InventoryLedger, MessageReceiver, Outbound, PlannerCfg, RecipeCfg, RunSummary,
    RunnerCfg, Station, run_until,
};
use scent_traits::{Indicator, Plate, Valve};

/// Open the persisted ledger described by `cfg`.
pub fn open_ledger(cfg: &scent_config::Config) -> CoreResult<InventoryLedger> {
    let inv = InventoryCfg::from(cfg);
    let ledger = InventoryLedger::open(&inv, Box::new(FileStore::new(&cfg.inventory.path)))
        .wrap_err_with(|| format!("open inventory {}", cfg.inventory.path))?;
    Ok(ledger)
}

#[cfg(feature = "hardware")]
fn open_rig(
    cfg: &scent_config::Config,
) -> CoreResult<(
    scent_hardware::HardwarePlate,
    scent_hardware::HardwareValve,
    scent_hardware::LedIndicator,
)> {
    let p = &cfg.pins;
    let v = &cfg.valve;
    let (plate, valve) = scent_hardware::open_servo_rig(
        p.i2c_bus,
        p.pca9685_addr,
        p.plate_channel,
        p.valve_channel,
        (v.open_angle, v.closed_angle, v.rest_angle),
    )
    .wrap_err("open PCA9685 servo driver")?;
    let led = scent_hardware::LedIndicator::new(p.led).wrap_err("open status LED")?;
    Ok((plate, valve, led))
}

#[cfg(not(feature = "hardware"))]
fn open_rig(
    _cfg: &scent_config::Config,
) -> CoreResult<(
    scent_hardware::SimulatedPlate,
    scent_hardware::SimulatedValve,
    scent_hardware::SimulatedIndicator,
)> {
    tracing::info!("hardware feature disabled; using simulated plate, valve and indicator");
    Ok((
        scent_hardware::SimulatedPlate::new(),
        scent_hardware::SimulatedValve::new(),
        scent_hardware::SimulatedIndicator::new(),
    ))
}

/// Forward non-empty lines from `reader` until EOF; dropping `tx` closes the source.
fn spawn_line_reader(reader: Box<dyn BufRead + Send>, tx: xch::Sender<String>) {
    std::thread::spawn(move || {
        for line in reader.lines() {
            match line {
                Ok(l) if l.trim().is_empty() => {}
                Ok(l) => {
                    if tx.send(l).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "input read failed; closing");
                    break;
                }
            }
        }
    });
}

fn spawn_writer(rx: xch::Receiver<Outbound>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let stdout = std::io::stdout();
        for msg in rx {
            let mut out = stdout.lock();
            if writeln!(out, "{}", msg.to_json()).and_then(|()| out.flush()).is_err() {
                break;
            }
        }
    })
}

pub fn run(
    cfg: &scent_config::Config,
    input: Option<&Path>,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    let ledger = open_ledger(cfg)?;
    let (plate, valve, indicator) = open_rig(cfg)?;

    let reader: Box<dyn BufRead + Send> = match input {
        Some(path) => Box::new(std::io::BufReader::new(
            std::fs::File::open(path).wrap_err_with(|| format!("open input {}", path.display()))?,
        )),
        None => Box::new(std::io::BufReader::new(std::io::stdin())),
    };

    let (outbox, out_rx) = ChannelOutbox::channel();
    let writer = spawn_writer(out_rx);
    let summary = serve(cfg, ledger, (plate, valve, indicator), reader, outbox, &shutdown);
    // every outbox sender is gone once serve returns; drain and stop the writer
    if writer.join().is_err() {
        tracing::warn!("stdout writer panicked");
    }
    Ok(summary)
}

fn serve<P: Plate, V: Valve, I: Indicator>(
    cfg: &scent_config::Config,
    ledger: InventoryLedger,
    (plate, valve, indicator): (P, V, I),
    reader: Box<dyn BufRead + Send>,
    outbox: ChannelOutbox,
    shutdown: &Arc<AtomicBool>,
) -> RunSummary {
    let runner = RunnerCfg::from(&cfg.runner);
    let station = Station::new(ledger, Arc::new(outbox));

    let (tx, rx) = xch::unbounded();
    spawn_line_reader(reader, tx);
    let receiver = MessageReceiver::spawn(
        ChannelSource::new(rx),
        CommandHandler::new(station.clone(), RecipeCfg::from(&cfg.recipe)),
        Duration::from_millis(runner.poll_ms),
    );

    let abort = shutdown.clone();
    let mut machine = ExecutionStateMachine::new(
        plate,
        valve,
        indicator,
        station,
        scent_core::MotionPlanner::new(PlannerCfg::from(cfg)),
        runner,
    )
    .with_abort_check(move || abort.load(Ordering::Relaxed));

    tracing::info!(start = ?runner.start, poll_ms = runner.poll_ms, "serving");
    run_until(&mut machine, shutdown, |m| {
        if !receiver.is_closed() {
            return false;
        }
        // input is gone; a recipe without a latched start can never run
        if m.state() == ExecState::Ready && !m.station().start.is_fired() {
            m.cancel_ready();
        }
        m.station().inbox.is_idle() && m.state() == ExecState::Idle
    })
}
