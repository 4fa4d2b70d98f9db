//! Applies decoded commands to the station.

use crate::bus::{Outbound, StatusKind};
use crate::config::RecipeCfg;
use crate::error::BlendError;
use crate::protocol::{Command, parse_command};
use crate::recipe::{Recipe, Step};
use crate::station::Station;

#[derive(Debug, Clone)]
pub struct CommandHandler {
    station: Station,
    cfg: RecipeCfg,
}

impl CommandHandler {
    #[must_use]
    pub fn new(station: Station, cfg: RecipeCfg) -> Self {
        Self { station, cfg }
    }

    /// Build the recipe a manufacture request describes.
    pub fn build_recipe(
        &self,
        steps: &[(u32, u32)],
        carrier_slot: Option<u32>,
    ) -> Result<Recipe, BlendError> {
        let divisor = self.cfg.proportion_divisor.max(1);
        let steps = steps
            .iter()
            .map(|&(slot, prop)| Step::new(slot, prop / divisor))
            .collect();
        let carrier = carrier_slot.map(|slot| Step::new(slot, self.cfg.carrier_proportion));
        Recipe::new(steps, carrier, self.cfg.max_steps)
            .map_err(|e| BlendError::MalformedMessage(e.to_string()))
    }

    /// Decode and apply one inbound payload.
    ///
    /// Errors are returned for logging only; status replies have already
    /// been published where the protocol calls for one.
    pub fn handle(&self, payload: &str) -> Result<(), BlendError> {
        let cmd = parse_command(payload)?;
        let st = &self.station;
        match cmd {
            Command::Manufacture {
                steps,
                carrier_slot,
            } => {
                let recipe = self.build_recipe(&steps, carrier_slot)?;
                tracing::info!(steps = recipe.steps().len(), carrier = ?carrier_slot, "manufacture request");
                // a start sent before this recipe does not count; a start for
                // the recipe already in flight stays latched
                if st.inbox.is_idle() {
                    let _ = st.start.take();
                }
                st.inbox.submit(recipe)
            }
            Command::Update(rows) => match st.ledger.apply_updates(&rows) {
                Ok(report) => {
                    let kind = if report.is_clean() {
                        StatusKind::Complete
                    } else {
                        StatusKind::Error
                    };
                    st.outbox.publish(Outbound::Update(kind));
                    Ok(())
                }
                Err(e) => {
                    st.outbox.publish(Outbound::Update(StatusKind::Error));
                    Err(e)
                }
            },
            Command::Check => {
                let rows = st
                    .ledger
                    .snapshot()
                    .iter()
                    .map(|i| (i.id, i.current_ml))
                    .collect();
                st.outbox.publish(Outbound::Inventory(rows));
                Ok(())
            }
            Command::Connect => {
                st.outbox.publish(Outbound::Connect);
                Ok(())
            }
            Command::Start => {
                tracing::debug!("start command received");
                st.start.fire();
                Ok(())
            }
        }
    }
}
