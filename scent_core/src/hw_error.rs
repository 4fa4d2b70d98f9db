//! Maps `Box<dyn Error>` from trait boundaries to typed `BlendError`.
//!
//! The traits in `scent_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to the typed enum, with a feature-gated path for
//! `scent_hardware::HwError` downcasting.

use crate::error::BlendError;

/// Map an actuator error to a typed `BlendError`.
///
/// Known hardware error types are downcast first, then string heuristics apply.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> BlendError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<scent_hardware::error::HwError>() {
            return match hw {
                scent_hardware::error::HwError::Timeout => BlendError::Timeout,
                other => BlendError::ActuatorFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        BlendError::Timeout
    } else {
        BlendError::ActuatorFault(s)
    }
}
