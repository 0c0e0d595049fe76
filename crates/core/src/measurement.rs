//! Measurement error variance `H(t)`.

use std::fmt;

use crate::error::ModelError;

/// Variance of the observation noise.
pub trait MeasurementError: Send + Sync + fmt::Debug {
    /// `H(pos)`.
    fn variance(&self, pos: usize) -> f64;

    /// Whether `H` is the same for every position.
    fn is_time_invariant(&self) -> bool;

    /// Number of positions the variance is defined for (`None` = unbounded).
    fn horizon(&self) -> Option<usize> {
        None
    }
}

fn check_variance(value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelError::InvalidVariance {
            what: "measurement error",
            value,
        });
    }
    Ok(())
}

/// Constant measurement error variance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantError {
    h: f64,
}

impl ConstantError {
    /// Creates a constant variance `h >= 0`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidVariance`] when `h` is negative or non-finite.
    pub fn new(h: f64) -> Result<Self, ModelError> {
        check_variance(h)?;
        Ok(Self { h })
    }
}

impl MeasurementError for ConstantError {
    fn variance(&self, _pos: usize) -> f64 {
        self.h
    }

    fn is_time_invariant(&self) -> bool {
        true
    }
}

/// Measurement error variance given per position.
#[derive(Clone, Debug, PartialEq)]
pub struct VaryingError {
    h: Vec<f64>,
}

impl VaryingError {
    /// Creates a time-varying variance.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`ModelError::EmptyHorizon`] | `h` is empty |
    /// | [`ModelError::InvalidVariance`] | some entry is negative or non-finite |
    pub fn new(h: Vec<f64>) -> Result<Self, ModelError> {
        if h.is_empty() {
            return Err(ModelError::EmptyHorizon {
                what: "measurement error",
            });
        }
        for &value in &h {
            check_variance(value)?;
        }
        Ok(Self { h })
    }
}

impl MeasurementError for VaryingError {
    fn variance(&self, pos: usize) -> f64 {
        self.h[pos.min(self.h.len() - 1)]
    }

    fn is_time_invariant(&self) -> bool {
        false
    }

    fn horizon(&self) -> Option<usize> {
        Some(self.h.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_variance() {
        let h = ConstantError::new(0.5).unwrap();
        assert_eq!(h.variance(0), 0.5);
        assert_eq!(h.variance(1000), 0.5);
        assert!(h.is_time_invariant());
    }

    #[test]
    fn rejects_invalid_variance() {
        assert!(matches!(
            ConstantError::new(-1.0),
            Err(ModelError::InvalidVariance { .. })
        ));
        assert!(ConstantError::new(f64::NAN).is_err());
        assert!(VaryingError::new(vec![1.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn varying_variance() {
        let h = VaryingError::new(vec![1.0, 2.0]).unwrap();
        assert_eq!(h.variance(1), 2.0);
        assert_eq!(h.horizon(), Some(2));
        assert!(!h.is_time_invariant());
    }
}
