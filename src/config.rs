//! Run configuration.
//!
//! A [`RunConfig`] is built once by the binary (defaults, then an optional
//! JSON file, then command-line overrides) and handed to the runner. Nothing
//! here is global.

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Days, Months, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default filename pattern for device exports.
pub const DEFAULT_PATTERN: &str = "s*-*.csv";

/// Width of an aggregation bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Frequency {
    #[default]
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Frequency {
    /// Start of the calendar bin containing `ts`. Weeks start on Monday.
    pub fn floor(self, ts: NaiveDateTime) -> NaiveDateTime {
        let date = ts.date();
        let day = match self {
            Frequency::Hour => {
                return date.and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(ts.hour()));
            }
            Frequency::Day => date,
            Frequency::Week => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            Frequency::Month => date - Days::new(u64::from(date.day0())),
            Frequency::Year => date - Days::new(u64::from(date.ordinal0())),
        };
        day.and_time(NaiveTime::MIN)
    }

    /// Start of the bin after the one starting at `start`.
    pub fn next(self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Frequency::Hour => start.checked_add_signed(TimeDelta::hours(1)),
            Frequency::Day => start.checked_add_days(Days::new(1)),
            Frequency::Week => start.checked_add_days(Days::new(7)),
            Frequency::Month => start.checked_add_months(Months::new(1)),
            Frequency::Year => start.checked_add_months(Months::new(12)),
        }
    }
}

impl FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "h" | "hour" | "hourly" => Ok(Frequency::Hour),
            "d" | "day" | "daily" => Ok(Frequency::Day),
            "w" | "week" | "weekly" => Ok(Frequency::Week),
            "m" | "month" | "monthly" => Ok(Frequency::Month),
            "y" | "year" | "yearly" => Ok(Frequency::Year),
            other => bail!("unknown frequency '{other}' (expected h, d, w, m or y)"),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Outer calendar period used for busiest-bin selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum BusiestPeriod {
    Day,
    Week,
    Month,
    Year,
}

impl BusiestPeriod {
    /// Start of the period containing `ts`.
    pub fn start_of(self, ts: NaiveDateTime) -> NaiveDateTime {
        let frequency = match self {
            BusiestPeriod::Day => Frequency::Day,
            BusiestPeriod::Week => Frequency::Week,
            BusiestPeriod::Month => Frequency::Month,
            BusiestPeriod::Year => Frequency::Year,
        };
        frequency.floor(ts)
    }
}

impl FromStr for BusiestPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "d" | "day" => Ok(BusiestPeriod::Day),
            "w" | "week" => Ok(BusiestPeriod::Week),
            "m" | "month" => Ok(BusiestPeriod::Month),
            "y" | "year" => Ok(BusiestPeriod::Year),
            other => bail!("unknown busiest period '{other}' (expected day, week, month or year)"),
        }
    }
}

impl TryFrom<String> for BusiestPeriod {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for BusiestPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BusiestPeriod::Day => "Day",
            BusiestPeriod::Week => "Week",
            BusiestPeriod::Month => "Month",
            BusiestPeriod::Year => "Year",
        };
        f.write_str(name)
    }
}

/// What to do when a selected busiest bin lacks DL Capacity or RF Utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusiestValidity {
    /// Any invalid group suppresses the whole busiest output.
    #[default]
    SuppressAll,
    /// Only the invalid groups are dropped.
    PerGroup,
}

/// Everything a run needs to know.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub pattern: String,
    pub frequency: Frequency,
    pub busiest: Option<BusiestPeriod>,
    /// `None` writes to stdout.
    pub output: Option<PathBuf>,
    /// Files processed at once. 1 keeps the run strictly sequential.
    pub concurrency: usize,
    /// Report a count of 0 (carrier bandwidth, active connections) as missing.
    pub zero_counts_as_missing: bool,
    pub busiest_validity: BusiestValidity,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            pattern: DEFAULT_PATTERN.to_string(),
            frequency: Frequency::Hour,
            busiest: None,
            output: None,
            concurrency: 1,
            zero_counts_as_missing: true,
            busiest_validity: BusiestValidity::SuppressAll,
        }
    }
}

impl RunConfig {
    /// Loads a config from a JSON file at `path`. Missing keys take defaults.
    ///
    /// ```json
    /// { "input_dir": "exports", "frequency": "d", "busiest": "month" }
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: RunConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.pattern.trim().is_empty() {
            bail!("file pattern must not be empty");
        }
        Ok(())
    }
}
