use crate::error::DemographyError;

/// The size of a deme at a given [`Time`](crate::Time).
///
/// This is a newtype wrapper for [`f64`](std::primitive::f64).
///
/// # Notes
///
/// * Sizes may take non-integer values.
/// * Valid values are finite and strictly positive.  A deme
///   that does not exist at a query time is reported with size
///   `0.0` by [`ForwardGraph`](crate::ForwardGraph), outside
///   this type.
///
/// # Examples
///
/// ```
/// let size = forward_demography::DemeSize::try_from(100.0).unwrap();
/// assert_eq!(size, 100.0);
/// ```
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct DemeSize(f64);

impl_newtype_traits!(DemeSize);

impl TryFrom<f64> for DemeSize {
    type Error = DemographyError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_nan() || value.is_infinite() || value <= 0.0 {
            Err(DemographyError::Validation(format!(
                "deme sizes must be 0 < d < Infinity, got: {value}"
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
    fn reject_invalid_sizes() {
        assert!(DemeSize::try_from(0.0).is_err());
        assert!(DemeSize::try_from(-50.0).is_err());
        assert!(DemeSize::try_from(f64::INFINITY).is_err());
        assert!(DemeSize::try_from(f64::NAN).is_err());
        assert!(DemeSize::try_from(0.25).is_ok());
    }
}
