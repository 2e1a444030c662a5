use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("granularity should be one of [QUARTERS, HOURS]")]
pub struct GranularityError;

/// Width of a precomputed aggregation bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// 15 minutes.
    Quarters,
    /// 60 minutes.
    #[default]
    Hours,
}

impl Granularity {
    pub fn minutes(self) -> i32 {
        match self {
            Granularity::Quarters => 15,
            Granularity::Hours => 60,
        }
    }
}

impl FromStr for Granularity {
    type Err = GranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quarters" => Ok(Granularity::Quarters),
            "hours" => Ok(Granularity::Hours),
            _ => Err(GranularityError),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Quarters => f.write_str("quarters"),
            Granularity::Hours => f.write_str("hours"),
        }
    }
}
