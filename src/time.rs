use crate::error::DemographyError;

/// A point in model time.
///
/// This is a newtype wrapper for [`f64`](std::primitive::f64).
///
/// # Notes
///
/// * Time is measured backwards: it decreases towards 0 at
///   the present.
/// * `start_time` values may be infinite (the unbounded past).
///   Negative and NaN values are invalid.
///
/// # Examples
///
/// ```
/// let t = forward_demography::Time::try_from(50.0).unwrap();
/// assert_eq!(t, 50.0);
/// assert!(forward_demography::Time::try_from(-1.0).is_err());
/// ```
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Time(f64);

impl_newtype_traits!(Time);

impl Time {
    pub(crate) fn infinity() -> Self {
        Self(f64::INFINITY)
    }

    /// `true` unless the value is positive infinity.
    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    pub(crate) fn total_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for Time {
    type Error = DemographyError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_nan() || value < 0.0 {
            Err(DemographyError::Validation(format!(
                "times must be 0 <= t <= Infinity, got: {value}"
            )))
        } else {
            Ok(Self(value))
        }
    }
}

/// A half-closed span of model time, oldest boundary first.
#[derive(Clone, Copy, Debug)]
pub struct TimeInterval {
    start_time: Time,
    end_time: Time,
}

impl TimeInterval {
    pub(crate) fn new(start_time: Time, end_time: Time) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// The oldest time of the interval.
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// The most recent time of the interval.
    pub fn end_time(&self) -> Time {
        self.end_time
    }

    /// Containment over the closed interval `[end_time, start_time]`.
    pub fn contains_inclusive<T: Into<f64>>(&self, time: T) -> bool {
        let time = time.into();
        time >= self.end_time.0 && time <= self.start_time.0
    }

    /// Containment excluding the oldest boundary, `[end_time, start_time)`.
    ///
    /// This is the convention for migration intervals: a rate
    /// applies at its (most recent) `end_time` but not at its
    /// (oldest) `start_time`.
    pub fn contains_exclusive_start<T: Into<f64>>(&self, time: T) -> bool {
        let time = time.into();
        time >= self.end_time.0 && time < self.start_time.0
    }
}
