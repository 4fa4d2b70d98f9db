//! Inbound command envelopes.
//!
//! `{ "CMD": "...", "data": ... }` with an optional top-level `carrier`
//! (alias `ethanol`) on manufacture requests. Field aliases cover the
//! spellings the operator app has used over time.

use crate::error::BlendError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "CMD", alias = "cmd")]
    cmd: String,
    #[serde(default)]
    data: Value,
    #[serde(default, alias = "ethanol")]
    carrier: Option<WireSlot>,
}

#[derive(Debug, Deserialize)]
struct WireStep {
    #[serde(rename = "slotId", alias = "SlotId", alias = "slot_id")]
    slot_id: u32,
    #[serde(alias = "prop")]
    proportion: u32,
}

#[derive(Debug, Deserialize)]
struct WireSlot {
    #[serde(rename = "slotId", alias = "SlotId", alias = "slot_id")]
    slot_id: u32,
}

#[derive(Debug, Deserialize)]
struct WireUpdate {
    #[serde(rename = "slotId", alias = "SlotId", alias = "slot_id")]
    slot_id: u32,
    #[serde(rename = "newCapacityMl", alias = "capacity", alias = "capacityMl")]
    capacity_ml: i64,
}

/// A decoded inbound command. Proportions are as sent by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Manufacture {
        steps: Vec<(u32, u32)>,
        carrier_slot: Option<u32>,
    },
    Update(Vec<(u32, i64)>),
    Check,
    Connect,
    Start,
}

fn malformed(what: &str, e: impl std::fmt::Display) -> BlendError {
    BlendError::MalformedMessage(format!("{what}: {e}"))
}

pub fn parse_command(payload: &str) -> Result<Command, BlendError> {
    let env: Envelope = serde_json::from_str(payload).map_err(|e| malformed("envelope", e))?;
    match env.cmd.as_str() {
        "manufacture" => {
            let steps: Vec<WireStep> =
                serde_json::from_value(env.data).map_err(|e| malformed("manufacture data", e))?;
            Ok(Command::Manufacture {
                steps: steps.into_iter().map(|s| (s.slot_id, s.proportion)).collect(),
                carrier_slot: env.carrier.map(|c| c.slot_id),
            })
        }
        "update" => {
            let rows: Vec<WireUpdate> =
                serde_json::from_value(env.data).map_err(|e| malformed("update data", e))?;
            Ok(Command::Update(
                rows.into_iter().map(|r| (r.slot_id, r.capacity_ml)).collect(),
            ))
        }
        "check" => Ok(Command::Check),
        "connect" => Ok(Command::Connect),
        "start" => Ok(Command::Start),
        other => Err(BlendError::MalformedMessage(format!(
            "unknown CMD '{other}'"
        ))),
    }
}
