use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::monitor::strain::StrainLevel;

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_strain_level(value: &str) -> Result<StrainLevel> {
    match value {
        "low" => Ok(StrainLevel::Low),
        "moderate" => Ok(StrainLevel::Moderate),
        "high" => Ok(StrainLevel::High),
        other => Err(anyhow!("unknown eye strain level {other}")),
    }
}
