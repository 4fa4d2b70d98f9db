//! Cooperative polling loop for the execution context.

use crate::machine::ExecutionStateMachine;
use crate::status::PollStatus;
use scent_traits::{Indicator, Plate, Valve};
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome counts of a `run_until` session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: u32,
    pub rejected: u32,
    pub failed: u32,
    pub polls: u64,
}

/// Poll `machine` until `shutdown` is set or `stop` returns true.
///
/// `stop` is evaluated after every poll. Idle and waiting polls sleep one
/// poll period; finishing a recipe polls again immediately.
pub fn run_until<P, V, I, F>(
    machine: &mut ExecutionStateMachine<P, V, I>,
    shutdown: &AtomicBool,
    mut stop: F,
) -> RunSummary
where
    P: Plate,
    V: Valve,
    I: Indicator,
    F: FnMut(&mut ExecutionStateMachine<P, V, I>) -> bool,
{
    let mut summary = RunSummary::default();
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested; leaving run loop");
            break;
        }
        let status = machine.poll();
        summary.polls += 1;
        let busy = match status {
            PollStatus::Completed => {
                summary.completed += 1;
                true
            }
            PollStatus::Rejected(_) => {
                summary.rejected += 1;
                true
            }
            PollStatus::Failed(e) => {
                tracing::error!(error = %e, "recipe failed");
                summary.failed += 1;
                true
            }
            PollStatus::Idle | PollStatus::Waiting => false,
        };
        if stop(machine) {
            break;
        }
        if !busy {
            machine.idle_wait();
        }
    }
    tracing::info!(
        completed = summary.completed,
        rejected = summary.rejected,
        failed = summary.failed,
        "run loop finished"
    );
    summary
}
