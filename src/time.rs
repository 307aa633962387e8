//! Simulation time of configuration snapshots.
//!
//! Times are plain non-negative reals in the unit of the driving schedule.
//! [`TimeInstant`] makes them totally ordered so they can key a `BTreeMap`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// A finite, non-negative point in simulation time.
///
/// # Examples
///
/// ```
/// use coremap::TimeInstant;
///
/// let t = TimeInstant::new(2.5).unwrap();
/// assert!(TimeInstant::ZERO < t);
/// assert!(TimeInstant::new(-1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct TimeInstant(f64);

impl TimeInstant {
    /// Start of the run.
    pub const ZERO: Self = Self(0.0);

    /// Creates an instant.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidTime` for negative or non-finite
    /// values.
    pub fn new(t: f64) -> Result<Self, ConfigurationError> {
        if !t.is_finite() {
            return Err(ConfigurationError::InvalidTime {
                time: t,
                reason: "time must be finite".to_string(),
            });
        }
        if t < 0.0 {
            return Err(ConfigurationError::InvalidTime {
                time: t,
                reason: "time must be non-negative".to_string(),
            });
        }
        // -0.0 and 0.0 must key the same snapshot.
        Ok(Self(t + 0.0))
    }

    /// Time in seconds.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for TimeInstant {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeInstant {}

impl PartialOrd for TimeInstant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeInstant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for TimeInstant {
    type Error = ConfigurationError;

    fn try_from(t: f64) -> Result<Self, Self::Error> {
        Self::new(t)
    }
}

impl From<TimeInstant> for f64 {
    fn from(t: TimeInstant) -> Self {
        t.0
    }
}

impl fmt::Display for TimeInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_nan() {
        assert!(TimeInstant::new(-0.5).is_err());
        assert!(TimeInstant::new(f64::NAN).is_err());
        assert!(TimeInstant::new(f64::INFINITY).is_err());
    }

    #[test]
    fn negative_zero_equals_zero() {
        assert_eq!(TimeInstant::new(-0.0).unwrap(), TimeInstant::ZERO);
    }

    #[test]
    fn orders_totally() {
        let mut times: Vec<TimeInstant> = [3.0, 0.0, 1.5]
            .into_iter()
            .map(|t| TimeInstant::new(t).unwrap())
            .collect();
        times.sort();
        let values: Vec<f64> = times.into_iter().map(f64::from).collect();
        assert_eq!(values, vec![0.0, 1.5, 3.0]);
    }

    #[test]
    fn serde_validates() {
        let t: TimeInstant = serde_json::from_str("2.0").unwrap();
        assert_eq!(t.value(), 2.0);
        assert!(serde_json::from_str::<TimeInstant>("-2.0").is_err());
        assert_eq!(serde_json::to_string(&t).unwrap(), "2.0");
    }
}
