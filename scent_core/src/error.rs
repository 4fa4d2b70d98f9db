use thiserror::Error;

/// Failures of the inventory ledger. None of them mutate stock.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient stock in slot {slot_id}: required {required} ml, available {available} ml")]
    InsufficientStock {
        slot_id: u32,
        required: u32,
        available: u32,
    },
    #[error("invalid slot {slot_id}")]
    InvalidSlot { slot_id: u32 },
    #[error("another reservation is still outstanding")]
    ReservationOutstanding,
    #[error("reservation token does not match the outstanding reservation")]
    UnknownReservation,
    #[error("capacity {capacity_ml} ml for slot {slot_id} is outside 0..={max_ml}")]
    CapacityOutOfRange {
        slot_id: u32,
        capacity_ml: i64,
        max_ml: u32,
    },
}

/// Why a recipe was abandoned without an actuator fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The abort hook asked to stop between instructions.
    Cancelled,
    /// No start command arrived while READY.
    StartTimeout,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::StartTimeout => f.write_str("start timeout"),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum BlendError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    #[error("recipe rejected: another recipe is pending or running")]
    RecipeRejected,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("actuator fault: {0}")]
    ActuatorFault(String),
    #[error("timeout waiting for actuator")]
    Timeout,
    #[error("persistence fault: {0}")]
    Persistence(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("aborted: {0}")]
    Abort(AbortReason),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing plate")]
    MissingPlate,
    #[error("missing valve")]
    MissingValve,
    #[error("missing indicator")]
    MissingIndicator,
    #[error("missing station wiring")]
    MissingStation,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
