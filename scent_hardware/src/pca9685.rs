use std::time::Duration;
use tracing::trace;

use rppal::i2c::I2c;

use crate::error::{HwError, Result};

const MODE1: u8 = 0x00;
const PRESCALE: u8 = 0xFE;
const LED0_ON_L: u8 = 0x06;

const MODE1_SLEEP: u8 = 0x10;
const MODE1_RESTART_AI_ALLCALL: u8 = 0xA1;
// round(25 MHz / (4096 * 50 Hz)) - 1
const PRESCALE_50HZ: u8 = 121;

/// 16-channel PWM expander driving the plate and valve servos.
pub struct Pca9685 {
    i2c: I2c,
}

impl Pca9685 {
    pub fn new(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(e.to_string()))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        let mut dev = Self { i2c };
        dev.init()?;
        Ok(dev)
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<()> {
        self.i2c
            .smbus_write_byte(reg, value)
            .map_err(|e| HwError::I2c(e.to_string()))
    }

    fn init(&mut self) -> Result<()> {
        // Prescale can only be written while the oscillator sleeps.
        self.write(MODE1, MODE1_SLEEP)?;
        self.write(PRESCALE, PRESCALE_50HZ)?;
        self.write(MODE1, 0x00)?;
        std::thread::sleep(Duration::from_millis(5));
        self.write(MODE1, MODE1_RESTART_AI_ALLCALL)
    }

    /// Program one channel's on/off ticks (0..4096).
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        if channel > 15 {
            return Err(HwError::Channel(channel));
        }
        let reg = LED0_ON_L + 4 * channel;
        let [on_l, on_h] = on.to_le_bytes();
        let [off_l, off_h] = off.to_le_bytes();
        self.write(reg, on_l)?;
        self.write(reg + 1, on_h)?;
        self.write(reg + 2, off_l)?;
        self.write(reg + 3, off_h)?;
        trace!(channel, on, off, "pca9685 pwm");
        Ok(())
    }
}
