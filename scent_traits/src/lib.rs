//! Collaborator interfaces for the blending rig.
//!
//! The orchestrator never touches a pin or a bus directly; everything
//! physical goes through these traits so that the same execution code runs
//! against the PCA9685 servos on the device and the simulators in tests.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Boxed error used at every collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The rotating plate that brings a reservoir slot under the valve.
pub trait Plate {
    /// Begin moving the plate by `delta_degrees` (sign is direction of travel).
    ///
    /// The caller waits out the planned rotation time and then calls `hold`.
    fn rotate(&mut self, delta_degrees: i64) -> Result<(), BoxError>;
    /// Stop the plate at its current position.
    fn hold(&mut self) -> Result<(), BoxError>;
}

/// The dispense valve above the mixing vessel.
pub trait Valve {
    fn open(&mut self) -> Result<(), BoxError>;
    fn close(&mut self) -> Result<(), BoxError>;
}

/// Visual events emitted to the operator indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorEvent {
    /// A recipe passed the inventory check.
    Accepted,
    /// Actuation has begun.
    Running,
    /// Every instruction completed.
    Complete,
    /// Execution stopped on a fault or abort.
    Fault,
}

/// Fire-and-forget status light. Implementations swallow their own errors.
pub trait Indicator {
    fn signal(&mut self, event: IndicatorEvent);
}

impl<T: Plate + ?Sized> Plate for Box<T> {
    fn rotate(&mut self, delta_degrees: i64) -> Result<(), BoxError> {
        (**self).rotate(delta_degrees)
    }
    fn hold(&mut self) -> Result<(), BoxError> {
        (**self).hold()
    }
}

impl<T: Valve + ?Sized> Valve for Box<T> {
    fn open(&mut self) -> Result<(), BoxError> {
        (**self).open()
    }
    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }
}

impl<T: Indicator + ?Sized> Indicator for Box<T> {
    fn signal(&mut self, event: IndicatorEvent) {
        (**self).signal(event)
    }
}
