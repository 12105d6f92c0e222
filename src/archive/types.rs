//! Core value types for Whisper archives
//!
//! - `RetentionStanza`: one storage tier (`secondsPerPoint:points`)
//! - `AggregationMethod`: how a tier rolls points up into the next
//! - `XFilesFactor`: validated fill factor in `[0, 1]`

use nom::{
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map_res, opt},
    sequence::{pair, separated_pair},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ArchiveError;

/// One archive tier: a sampling interval and how many points it keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetentionStanza {
    /// Seconds covered by each point
    pub seconds_per_point: u64,
    /// Number of points stored in this tier
    pub points: u64,
}

impl RetentionStanza {
    pub fn new(seconds_per_point: u64, points: u64) -> Self {
        Self {
            seconds_per_point,
            points,
        }
    }

    /// Total time covered by this tier, in seconds
    pub fn retention_secs(&self) -> u64 {
        self.seconds_per_point.saturating_mul(self.points)
    }

    /// Render as the `<secondsPerPoint>:<points>` argument the resize tool takes
    pub fn to_arg(&self) -> String {
        format!("{}:{}", self.seconds_per_point, self.points)
    }
}

impl fmt::Display for RetentionStanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.seconds_per_point, self.points)
    }
}

/// Parses `60:1440`, `1m:1d`, `10s:6h` and friends.
///
/// A unit on the precision side scales it to seconds. A unit on the points
/// side makes it a duration, which is divided by the precision.
impl FromStr for RetentionStanza {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, ((precision, precision_unit), (count, count_unit))) =
            all_consuming(retention_def)(s.trim())
                .map_err(|_| ArchiveError::InvalidRetention(s.to_string()))?;

        let seconds_per_point = precision
            .checked_mul(precision_unit.map(unit_seconds).unwrap_or(1))
            .ok_or_else(|| ArchiveError::InvalidRetention(s.to_string()))?;
        if seconds_per_point == 0 {
            return Err(ArchiveError::InvalidRetention(s.to_string()));
        }

        let points = match count_unit {
            None => count,
            Some(unit) => {
                let duration = count
                    .checked_mul(unit_seconds(unit))
                    .ok_or_else(|| ArchiveError::InvalidRetention(s.to_string()))?;
                duration / seconds_per_point
            }
        };
        if points == 0 {
            return Err(ArchiveError::InvalidRetention(s.to_string()));
        }

        Ok(Self::new(seconds_per_point, points))
    }
}

fn number(input: &str) -> IResult<&str, u64> {
    map_res(digit1, str::parse)(input)
}

fn quantity(input: &str) -> IResult<&str, (u64, Option<char>)> {
    pair(number, opt(one_of("smhdwy")))(input)
}

fn retention_def(input: &str) -> IResult<&str, ((u64, Option<char>), (u64, Option<char>))> {
    separated_pair(quantity, char(':'), quantity)(input)
}

fn unit_seconds(unit: char) -> u64 {
    match unit {
        'm' => 60,
        'h' => 3_600,
        'd' => 86_400,
        'w' => 604_800,
        'y' => 31_536_000,
        _ => 1,
    }
}

/// How points are rolled up from one tier into the next
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    Average,
    Sum,
    Last,
    Max,
    Min,
    /// Average treating missing points as zero
    AvgZero,
    /// Value with the largest absolute magnitude
    Absmax,
    /// Value with the smallest absolute magnitude
    Absmin,
}

impl AggregationMethod {
    /// Get all methods for iteration
    pub fn all() -> &'static [AggregationMethod] {
        &[
            AggregationMethod::Average,
            AggregationMethod::Sum,
            AggregationMethod::Last,
            AggregationMethod::Max,
            AggregationMethod::Min,
            AggregationMethod::AvgZero,
            AggregationMethod::Absmax,
            AggregationMethod::Absmin,
        ]
    }

    /// Name as understood by the set-aggregation tool
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Average => "average",
            AggregationMethod::Sum => "sum",
            AggregationMethod::Last => "last",
            AggregationMethod::Max => "max",
            AggregationMethod::Min => "min",
            AggregationMethod::AvgZero => "avg_zero",
            AggregationMethod::Absmax => "absmax",
            AggregationMethod::Absmin => "absmin",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMethod {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        AggregationMethod::all()
            .iter()
            .copied()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ArchiveError::UnknownAggregation(s.to_string()))
    }
}

/// Minimum fraction of known points needed for an aggregated point to be valid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64")]
pub struct XFilesFactor(f64);

impl TryFrom<f64> for XFilesFactor {
    type Error = ArchiveError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl XFilesFactor {
    pub fn new(value: f64) -> Result<Self, ArchiveError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ArchiveError::InvalidFillFactor(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Render as the `--xFilesFactor=<value>` flag the resize tool takes
    pub fn to_flag(&self) -> String {
        format!("--xFilesFactor={}", self.0)
    }
}

impl fmt::Display for XFilesFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for XFilesFactor {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| ArchiveError::InvalidFillFactorText(s.to_string()))?;
        Self::new(value)
    }
}
