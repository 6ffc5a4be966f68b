use crate::error::DemographyError;

/// An ancestry or pulse proportion.
///
/// This is a newtype wrapper for [`f64`](std::primitive::f64).
/// Valid values are in `(0, 1]`.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Proportion(f64);

impl_newtype_traits!(Proportion);

impl TryFrom<f64> for Proportion {
    type Error = DemographyError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            Err(DemographyError::Validation(format!(
                "proportions must be 0.0 < p <= 1.0, got: {value}"
            )))
        } else {
            Ok(Self(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_invalid_proportions() {
        assert!(Proportion::try_from(0.0).is_err());
        assert!(Proportion::try_from(1.0 + 1e-9).is_err());
        assert!(Proportion::try_from(f64::NAN).is_err());
        assert!(Proportion::try_from(1.0).is_ok());
        assert!(Proportion::try_from(0.5).is_ok());
    }
}
