pub mod aggregator;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::constants::{
    INTERVAL_15M, INTERVAL_1D, INTERVAL_1H, INTERVAL_1M, INTERVAL_30M, INTERVAL_4H, INTERVAL_5M,
};

pub use aggregator::{aggregate, bucket_start};

/// Supported history timeframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    FourHours,
    OneDay,
}

impl Timeframe {
    pub fn all() -> [Timeframe; 7] {
        [
            Timeframe::OneMinute,
            Timeframe::FiveMinutes,
            Timeframe::FifteenMinutes,
            Timeframe::ThirtyMinutes,
            Timeframe::OneHour,
            Timeframe::FourHours,
            Timeframe::OneDay,
        ]
    }

    /// Bucket width in minutes
    pub fn minutes(&self) -> u32 {
        match self {
            Timeframe::OneMinute => 1,
            Timeframe::FiveMinutes => 5,
            Timeframe::FifteenMinutes => 15,
            Timeframe::ThirtyMinutes => 30,
            Timeframe::OneHour => 60,
            Timeframe::FourHours => 240,
            Timeframe::OneDay => 1440,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::OneMinute => INTERVAL_1M,
            Timeframe::FiveMinutes => INTERVAL_5M,
            Timeframe::FifteenMinutes => INTERVAL_15M,
            Timeframe::ThirtyMinutes => INTERVAL_30M,
            Timeframe::OneHour => INTERVAL_1H,
            Timeframe::FourHours => INTERVAL_4H,
            Timeframe::OneDay => INTERVAL_1D,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::all()
            .into_iter()
            .find(|tf| tf.label() == s)
            .ok_or_else(|| format!("Unsupported timeframe '{}'", s))
    }
}

impl TryFrom<String> for Timeframe {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.label().to_string()
    }
}
