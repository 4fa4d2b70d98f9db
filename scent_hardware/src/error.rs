use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("pwm channel {0} out of range (0..=15)")]
    Channel(u8),
    #[error("actuator timeout")]
    Timeout,
    #[error("actuator fault: {0}")]
    Fault(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
