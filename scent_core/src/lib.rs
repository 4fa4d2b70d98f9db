#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Recipe execution orchestrator (hardware-agnostic).
//!
//! All physical interaction goes through `scent_traits::{Plate, Valve, Indicator}`.
//!
//! ## Architecture
//!
//! - **RecipeInbox**: single-slot handoff from the reception thread (`inbox`)
//! - **InventoryLedger**: all-or-nothing reserve, commit after use, persisted via `store`
//! - **MotionPlanner**: pure step list → rotation/dispense timing (`planner`)
//! - **ExecutionStateMachine**: IDLE→READY→RUNNING→COMPLETE/ERROR (`machine`)
//! - **Protocol**: command envelopes, replies and the reception thread
//!   (`protocol`, `handler`, `bus`, `receiver`)
//!
//! Data flow: reception thread → inbox → (poll) machine → ledger check →
//! planner → plate/valve per step → ledger commit → status event.

pub mod builder;
pub mod bus;
pub mod config;
pub mod conversions;
pub mod error;
pub mod handler;
pub mod hw_error;
pub mod inbox;
pub mod inventory;
pub mod machine;
pub mod mocks;
pub mod planner;
pub mod protocol;
pub mod receiver;
pub mod recipe;
pub mod runner;
pub mod station;
pub mod status;
pub mod store;

pub use builder::MachineBuilder;
pub use bus::{ChannelOutbox, ChannelSource, Delivery, MessageSource, Outbound, Outbox, StatusKind};
pub use config::{DispenseCurve, InventoryCfg, PlannerCfg, RecipeCfg, RunnerCfg, SlotSpec, StartMode};
pub use error::{AbortReason, BlendError, BuildError, LedgerError};
pub use handler::CommandHandler;
pub use inbox::RecipeInbox;
pub use inventory::{InventoryItem, InventoryLedger, ReservationToken, UpdateReport};
pub use machine::ExecutionStateMachine;
pub use planner::{Instruction, MotionPlanner, Plan};
pub use receiver::MessageReceiver;
pub use recipe::{Recipe, Step};
pub use runner::{RunSummary, run_until};
pub use station::{StartSignal, Station};
pub use status::{ExecState, PollStatus};
pub use store::{FileStore, InventoryStore};
