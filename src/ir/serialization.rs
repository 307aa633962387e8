//! Schedule serialization helpers.
//!
//! Serde already provides JSON serialization. This module keeps the
//! formatting stable and validates on the way in.

use crate::error::CoreResult;
use crate::ir::operations::Schedule;

/// Serialize a schedule to pretty JSON.
pub fn to_json_pretty(schedule: &Schedule) -> CoreResult<String> {
    Ok(serde_json::to_string_pretty(schedule)?)
}

/// Deserialize and validate a schedule from JSON.
pub fn from_json(s: &str) -> CoreResult<Schedule> {
    let schedule: Schedule = serde_json::from_str(s)?;
    schedule.validate()?;
    Ok(schedule)
}
