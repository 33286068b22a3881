//! Closed time interval attached to views.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A closed interval `[low, high]` on the timestamp axis.
///
/// The graph core never evaluates it; the external time index reads it when
/// resolving dynamic values through a view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    low: f64,
    high: f64,
}

impl Interval {
    /// The unrestricted interval `(-inf, +inf)`.
    pub const INFINITY: Interval = Interval { low: f64::NEG_INFINITY, high: f64::INFINITY };

    pub fn new(low: f64, high: f64) -> Result<Self> {
        if low.is_nan() || high.is_nan() {
            return Err(Error::Usage("interval bounds must not be NaN".into()));
        }
        if low > high {
            return Err(Error::Usage(format!("interval low {low} is greater than high {high}")));
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f64 { self.low }
    pub fn high(&self) -> f64 { self.high }

    pub fn is_infinite(&self) -> bool {
        self.low == f64::NEG_INFINITY && self.high == f64::INFINITY
    }

    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.low && timestamp <= self.high
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.low <= other.high && other.low <= self.high
    }
}

impl Default for Interval {
    fn default() -> Self { Interval::INFINITY }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}
