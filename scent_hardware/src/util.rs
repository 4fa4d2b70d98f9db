//! Servo pulse helpers for a PCA9685 running at 50 Hz.

/// PCA9685 off-tick for a 0° hobby-servo pulse at 50 Hz.
pub const SERVO_MIN_TICKS: u16 = 150;
/// PCA9685 off-tick for a 180° hobby-servo pulse at 50 Hz.
pub const SERVO_MAX_TICKS: u16 = 600;
/// Neutral pulse; a continuous-rotation servo stands still here.
pub const SERVO_NEUTRAL_TICKS: u16 = (SERVO_MIN_TICKS + SERVO_MAX_TICKS) / 2;

/// Map a positional-servo angle in degrees (clamped to 0..=180) to an off-tick.
#[inline]
pub fn angle_to_ticks(angle_deg: i32) -> u16 {
    let a = angle_deg.clamp(0, 180) as u32;
    let span = u32::from(SERVO_MAX_TICKS - SERVO_MIN_TICKS);
    SERVO_MIN_TICKS + (a * span / 180) as u16
}

/// Off-tick driving a continuous-rotation servo in the direction of `delta_deg`.
///
/// Zero delta yields the neutral pulse. `speed_ticks` is the offset from
/// neutral and is clamped so the pulse stays within the servo range.
#[inline]
pub fn rotation_ticks(delta_deg: i64, speed_ticks: u16) -> u16 {
    let max_offset = SERVO_MAX_TICKS - SERVO_NEUTRAL_TICKS;
    let offset = speed_ticks.min(max_offset);
    match delta_deg.signum() {
        1 => SERVO_NEUTRAL_TICKS + offset,
        -1 => SERVO_NEUTRAL_TICKS - offset,
        _ => SERVO_NEUTRAL_TICKS,
    }
}
