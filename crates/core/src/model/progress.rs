use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressValueError {
    #[error("progress must be a finite fraction in [0, 1], got {provided}")]
    OutOfRange { provided: f64 },
}

/// Completion ratio of a study item, always a fraction in `[0, 1]`.
///
/// Percentages exist only at the presentation boundary; use
/// [`Progress::as_percent`] and [`Progress::from_percent`] to convert.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Progress(f64);

impl Progress {
    pub const ZERO: Self = Self(0.0);
    pub const COMPLETE: Self = Self(1.0);

    /// Creates a progress value from a fraction.
    ///
    /// # Errors
    ///
    /// Returns `ProgressValueError::OutOfRange` for NaN, infinities or values
    /// outside `[0, 1]`.
    pub fn new(fraction: f64) -> Result<Self, ProgressValueError> {
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(ProgressValueError::OutOfRange { provided: fraction });
        }
        Ok(Self(fraction))
    }

    /// Creates a progress value from a percentage in `[0, 100]`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressValueError::OutOfRange` if the percentage is invalid.
    pub fn from_percent(percent: f64) -> Result<Self, ProgressValueError> {
        Self::new(percent / 100.0).map_err(|_| ProgressValueError::OutOfRange { provided: percent })
    }

    /// Builds a ratio, clamped to 1. Returns `None` when `total` is zero.
    #[must_use]
    pub fn ratio(completed: usize, total: usize) -> Option<Self> {
        if total == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = completed as f64 / total as f64;
        Some(Self(fraction.min(1.0)))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Percentage rounded to the nearest whole number.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn as_percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 >= 1.0
    }

    #[must_use]
    pub fn is_started(self) -> bool {
        self.0 > 0.0
    }
}

impl TryFrom<f64> for Progress {
    type Error = ProgressValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Progress> for f64 {
    fn from(value: Progress) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_values() {
        assert!(Progress::new(-0.01).is_err());
        assert!(Progress::new(1.01).is_err());
        assert!(Progress::new(f64::NAN).is_err());
        assert!(Progress::new(1.0).is_ok());
    }

    #[test]
    fn percent_conversion_rounds() {
        let p = Progress::new(0.666).unwrap();
        assert_eq!(p.as_percent(), 67);
        let q = Progress::from_percent(40.0).unwrap();
        assert!((q.value() - 0.4).abs() < f64::EPSILON);
        assert!(Progress::from_percent(120.0).is_err());
    }

    #[test]
    fn ratio_handles_empty_and_clamps() {
        assert_eq!(Progress::ratio(0, 0), None);
        assert_eq!(Progress::ratio(7, 5), Some(Progress::COMPLETE));
    }

    #[test]
    fn deserialize_rejects_invalid_fraction() {
        assert!(serde_json::from_str::<Progress>("0.25").is_ok());
        assert!(serde_json::from_str::<Progress>("3").is_err());
    }
}
