use crate::error::DemographyError;

/// A per-generation migration rate.
///
/// This is a newtype wrapper for [`f64`](std::primitive::f64).
/// Valid values are in `[0, 1]`.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct MigrationRate(f64);

impl_newtype_traits!(MigrationRate);

impl TryFrom<f64> for MigrationRate {
    type Error = DemographyError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value.is_sign_negative() || value > 1.0 {
            Err(DemographyError::Validation(format!(
                "migration rates must be 0.0 <= m <= 1.0, got: {value}"
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
    fn reject_invalid_rates() {
        assert!(MigrationRate::try_from(-0.1).is_err());
        assert!(MigrationRate::try_from(1.5).is_err());
        assert!(MigrationRate::try_from(f64::NAN).is_err());
        assert!(MigrationRate::try_from(0.0).is_ok());
        assert!(MigrationRate::try_from(1.0).is_ok());
    }
}
