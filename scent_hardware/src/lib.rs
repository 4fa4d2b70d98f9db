#[cfg(feature = "hardware")]
pub mod pca9685;

pub mod error;
pub mod util;

use scent_traits::{BoxError, Indicator, IndicatorEvent, Plate, Valve};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::HwError;

/// Simulated rotating plate.
///
/// Clones share state, so a test can keep a handle while the orchestrator
/// owns the other one.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPlate {
    angle: Rc<Cell<i64>>,
    moves: Rc<RefCell<Vec<i64>>>,
    fail_on_move: Rc<Cell<Option<usize>>>,
}

impl SimulatedPlate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated (unwrapped) plate angle in degrees.
    pub fn angle(&self) -> i64 {
        self.angle.get()
    }

    /// Every rotation delta commanded so far, in order.
    pub fn moves(&self) -> Vec<i64> {
        self.moves.borrow().clone()
    }

    /// Make the n-th rotation (0-based, counted from now on) fail once.
    pub fn fail_on_move(&self, n: usize) {
        self.fail_on_move.set(Some(self.moves.borrow().len() + n));
    }
}

impl Plate for SimulatedPlate {
    fn rotate(&mut self, delta_degrees: i64) -> Result<(), BoxError> {
        let idx = self.moves.borrow().len();
        if self.fail_on_move.get() == Some(idx) {
            self.fail_on_move.set(None);
            tracing::warn!(delta_degrees, "simulated plate fault");
            return Err(Box::new(HwError::Fault("plate jammed (simulated)".into())));
        }
        self.moves.borrow_mut().push(delta_degrees);
        self.angle.set(self.angle.get() + delta_degrees);
        tracing::debug!(delta_degrees, angle = self.angle.get(), "plate rotate (simulated)");
        Ok(())
    }

    fn hold(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Simulated dispense valve.
#[derive(Debug, Clone, Default)]
pub struct SimulatedValve {
    open: Rc<Cell<bool>>,
    opens: Rc<Cell<usize>>,
    fail_on_open: Rc<Cell<Option<usize>>>,
}

impl SimulatedValve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    /// Number of successful open commands.
    pub fn open_count(&self) -> usize {
        self.opens.get()
    }

    /// Make the n-th open (0-based, counted from now on) fail once.
    pub fn fail_on_open(&self, n: usize) {
        self.fail_on_open.set(Some(self.opens.get() + n));
    }
}

impl Valve for SimulatedValve {
    fn open(&mut self) -> Result<(), BoxError> {
        if self.fail_on_open.get() == Some(self.opens.get()) {
            self.fail_on_open.set(None);
            return Err(Box::new(HwError::Fault("valve stuck (simulated)".into())));
        }
        self.opens.set(self.opens.get() + 1);
        self.open.set(true);
        tracing::debug!("valve open (simulated)");
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.open.set(false);
        tracing::debug!("valve close (simulated)");
        Ok(())
    }
}

/// Simulated indicator that records every event.
#[derive(Debug, Clone, Default)]
pub struct SimulatedIndicator {
    events: Rc<RefCell<Vec<IndicatorEvent>>>,
}

impl SimulatedIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<IndicatorEvent> {
        self.events.borrow().clone()
    }
}

impl Indicator for SimulatedIndicator {
    fn signal(&mut self, event: IndicatorEvent) {
        tracing::info!(?event, "indicator (simulated)");
        self.events.borrow_mut().push(event);
    }
}

#[cfg(feature = "hardware")]
pub use hardware::{HardwarePlate, HardwareValve, LedIndicator, SharedPwm, open_servo_rig};

#[cfg(feature = "hardware")]
pub mod hardware {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use rppal::gpio::{Gpio, OutputPin};
    use scent_traits::{BoxError, Indicator, IndicatorEvent, Plate, Valve};

    use crate::error::HwError;
    use crate::pca9685::Pca9685;
    use crate::util::{SERVO_NEUTRAL_TICKS, angle_to_ticks, rotation_ticks};

    pub type SharedPwm = Arc<Mutex<Pca9685>>;

    fn set_ticks(pwm: &SharedPwm, channel: u8, off: u16) -> Result<(), HwError> {
        let mut dev = pwm
            .lock()
            .map_err(|_| HwError::I2c("pwm lock poisoned".into()))?;
        dev.set_pwm(channel, 0, off)
    }

    /// Plate on a continuous-rotation servo: direction by pulse, distance by time.
    pub struct HardwarePlate {
        pwm: SharedPwm,
        channel: u8,
        speed_ticks: u16,
    }

    impl HardwarePlate {
        pub fn new(pwm: SharedPwm, channel: u8, speed_ticks: u16) -> Self {
            Self {
                pwm,
                channel,
                speed_ticks,
            }
        }
    }

    impl Plate for HardwarePlate {
        fn rotate(&mut self, delta_degrees: i64) -> Result<(), BoxError> {
            let ticks = rotation_ticks(delta_degrees, self.speed_ticks);
            tracing::debug!(delta_degrees, ticks, "plate rotate");
            set_ticks(&self.pwm, self.channel, ticks)?;
            Ok(())
        }

        fn hold(&mut self) -> Result<(), BoxError> {
            set_ticks(&self.pwm, self.channel, SERVO_NEUTRAL_TICKS)?;
            Ok(())
        }
    }

    /// Valve on a positional servo. Closing parks at `closed_angle` then
    /// relaxes to `rest_angle` so the servo does not stall against the seat.
    pub struct HardwareValve {
        pwm: SharedPwm,
        channel: u8,
        open_angle: i32,
        closed_angle: i32,
        rest_angle: i32,
    }

    impl HardwareValve {
        pub fn new(
            pwm: SharedPwm,
            channel: u8,
            open_angle: i32,
            closed_angle: i32,
            rest_angle: i32,
        ) -> Self {
            Self {
                pwm,
                channel,
                open_angle,
                closed_angle,
                rest_angle,
            }
        }
    }

    impl Valve for HardwareValve {
        fn open(&mut self) -> Result<(), BoxError> {
            set_ticks(&self.pwm, self.channel, angle_to_ticks(self.open_angle))?;
            Ok(())
        }

        fn close(&mut self) -> Result<(), BoxError> {
            set_ticks(&self.pwm, self.channel, angle_to_ticks(self.closed_angle))?;
            std::thread::sleep(Duration::from_millis(500));
            set_ticks(&self.pwm, self.channel, angle_to_ticks(self.rest_angle))?;
            Ok(())
        }
    }

    /// Open the PCA9685 and hand back plate and valve sharing it.
    pub fn open_servo_rig(
        i2c_bus: u8,
        address: u16,
        plate_channel: u8,
        valve_channel: u8,
        valve_angles: (i32, i32, i32),
    ) -> Result<(HardwarePlate, HardwareValve), HwError> {
        let pwm: SharedPwm = Arc::new(Mutex::new(Pca9685::new(i2c_bus, address)?));
        let (open, closed, rest) = valve_angles;
        let mut valve = HardwareValve::new(pwm.clone(), valve_channel, open, closed, rest);
        // Start from a known-closed valve.
        valve
            .close()
            .map_err(|e| HwError::Fault(format!("initial valve close: {e}")))?;
        Ok((HardwarePlate::new(pwm, plate_channel, 40), valve))
    }

    /// Status LED on a single GPIO line.
    pub struct LedIndicator {
        pin: OutputPin,
    }

    impl LedIndicator {
        pub fn new(pin: u8) -> Result<Self, HwError> {
            let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
            let mut pin = gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(e.to_string()))?
                .into_output();
            pin.set_low();
            Ok(Self { pin })
        }
    }

    impl Indicator for LedIndicator {
        fn signal(&mut self, event: IndicatorEvent) {
            match event {
                IndicatorEvent::Accepted | IndicatorEvent::Running => self.pin.set_low(),
                IndicatorEvent::Complete => self.pin.set_high(),
                IndicatorEvent::Fault => {
                    for _ in 0..5 {
                        self.pin.set_high();
                        std::thread::sleep(Duration::from_millis(100));
                        self.pin.set_low();
                        std::thread::sleep(Duration::from_millis(100));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_plate_accumulates_unwrapped_angle() {
        let handle = SimulatedPlate::new();
        let mut plate = handle.clone();
        plate.rotate(300).unwrap();
        plate.rotate(120).unwrap();
        assert_eq!(handle.angle(), 420);
        assert_eq!(handle.moves(), vec![300, 120]);
    }

    #[test]
    fn simulated_valve_injected_fault() {
        let handle = SimulatedValve::new();
        let mut valve = handle.clone();
        handle.fail_on_open(1);
        valve.open().unwrap();
        valve.close().unwrap();
        let err = valve.open().expect_err("second open should fail");
        assert!(err.to_string().contains("stuck"));
        assert_eq!(handle.open_count(), 1);
        assert!(!handle.is_open());
        // injected faults fire once
        valve.open().unwrap();
        assert_eq!(handle.open_count(), 2);
    }
}
