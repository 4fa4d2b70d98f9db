//! Human-readable error descriptions and structured JSON error formatting.

use scent_core::error::{AbortReason, BlendError, BuildError, LedgerError};

pub const fn abort_reason_name(r: AbortReason) -> &'static str {
    match r {
        AbortReason::Cancelled => "Cancelled",
        AbortReason::StartTimeout => "StartTimeout",
    }
}

fn find_blend_error(err: &eyre::Report) -> Option<&BlendError> {
    err.chain().find_map(|e| e.downcast_ref::<BlendError>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingPlate | BuildError::MissingValve | BuildError::MissingIndicator => format!(
                "What happened: {be}.\nLikely causes: An actuator failed to initialize or was not wired into the builder.\nHow to fix: Check the [pins] section and that the PCA9685 and LED are reachable."
            ),
            BuildError::MissingStation => "What happened: The state machine has no station wiring.\nLikely causes: Inventory or outbox setup failed earlier.\nHow to fix: Re-run with --log-level=debug to see which step failed.".to_string(),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/scent.toml for a sample."
            ),
        };
    }

    if let Some(be) = find_blend_error(err) {
        return match be {
            BlendError::Persistence(m) => format!(
                "What happened: The stock file could not be read or written ({m}).\nLikely causes: Wrong inventory.path, missing directory, no write permission, or a hand-edited file with a bad line.\nHow to fix: Check the file; each line must be '<slot> <ml>'. Delete it to start over from default capacities."
            ),
            BlendError::Timeout => "What happened: An actuator timed out.\nLikely causes: PCA9685 not powered or I2C bus busy.\nHow to fix: Verify pins.i2c_bus and pins.pca9685_addr and the servo supply.".to_string(),
            BlendError::ActuatorFault(m) => format!(
                "What happened: Actuator fault ({m}).\nLikely causes: Servo stalled, wiring fault, or wrong PWM channel.\nHow to fix: Inspect the plate and valve mechanics and pins.plate_channel / pins.valve_channel."
            ),
            BlendError::Abort(AbortReason::Cancelled) => "What happened: The run was cancelled.\nLikely causes: Ctrl-C, or input closed while a recipe waited for start.\nHow to fix: Start a new session.".to_string(),
            BlendError::Abort(AbortReason::StartTimeout) => "What happened: No start command arrived in time.\nLikely causes: Operator app did not send \"start\".\nHow to fix: Send start sooner or raise runner.ready_timeout_ms (0 disables).".to_string(),
            BlendError::Ledger(LedgerError::InsufficientStock { slot_id, required, available }) => format!(
                "What happened: Not enough stock in slot {slot_id} ({available} ml, need {required} ml).\nLikely causes: Reservoir running low.\nHow to fix: Refill and send an update command, or lower the recipe."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();

    if lower.contains("slot table csv must have headers") {
        return "Invalid headers in slot table CSV. Expected 'slot,ingredient,max_ml,min_threshold_ml'.".to_string();
    }

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the configuration file.\nLikely causes: Wrong --config path.\nHow to fix: Pass --config <FILE> pointing at a TOML file (see etc/scent.toml). Original: {err:#}"
        );
    }

    if lower.contains("invalid configuration") || lower.contains("parse config toml") {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: Out-of-range or mistyped values.\nHow to fix: Edit the TOML config and try again. Details: {err:#}"
        );
    }

    if lower.contains("pca9685") || lower.contains("status led") || lower.contains("gpio") {
        return format!(
            "What happened: Failed to initialize hardware.\nLikely causes: I2C disabled, wrong address, or insufficient GPIO permissions.\nHow to fix: Enable I2C, check [pins], and run with access to /dev/i2c-* and /dev/gpiomem. Details: {err:#}"
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes; anything without a dedicated code returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match find_blend_error(err) {
        Some(BlendError::Abort(AbortReason::Cancelled)) => 2,
        Some(BlendError::Abort(AbortReason::StartTimeout)) => 3,
        Some(BlendError::Persistence(_)) => 4,
        Some(BlendError::ActuatorFault(_) | BlendError::Timeout) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = match find_blend_error(err) {
        Some(BlendError::Abort(r)) => abort_reason_name(*r),
        Some(BlendError::Persistence(_)) => "Persistence",
        Some(BlendError::ActuatorFault(_)) => "ActuatorFault",
        Some(BlendError::Timeout) => "Timeout",
        Some(BlendError::Ledger(_)) => "Ledger",
        Some(BlendError::MalformedMessage(_)) => "MalformedMessage",
        Some(BlendError::Config(_)) => "Config",
        Some(BlendError::RecipeRejected) => "RecipeRejected",
        None => "Error",
    };
    json!({
        "reason": reason,
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn wrapped_persistence_error_keeps_its_code() {
        let r: Result<(), BlendError> = Err(BlendError::Persistence("disk full".into()));
        let err = r.wrap_err("open inventory base_storage.txt").unwrap_err();
        assert_eq!(exit_code_for_error(&err), 4);
        assert!(humanize(&err).contains("disk full"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Persistence");
    }

    #[test]
    fn plain_errors_fall_back_to_generic_text() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).starts_with("Something went wrong."));
    }
}
