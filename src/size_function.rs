//! Size-function evaluation within a single epoch.

use std::fmt::{self, Display};

use serde::Deserialize;

use crate::deme_size::DemeSize;
use crate::error::DemographyError;
use crate::model::Epoch;

/// Fixed steepness of the normalized logistic curve.  Large
/// enough that growth visibly saturates towards `end_size`,
/// small enough that the curve stays well-conditioned over
/// short epochs.
const LOGISTIC_STEEPNESS: f64 = 6.0;

/// The rule mapping time to size within an epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeFunction {
    /// `start_size` throughout.  Requires `start_size == end_size`.
    Constant,
    /// Exponential growth or decay between the epoch boundary sizes.
    Exponential,
    /// A bounded sigmoidal curve between the epoch boundary
    /// sizes, normalized so both boundaries are hit exactly.
    Logistic,
}

impl Display for SizeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SizeFunction::Constant => "constant",
            SizeFunction::Exponential => "exponential",
            SizeFunction::Logistic => "logistic",
        };
        write!(f, "{value}")
    }
}

impl Epoch {
    /// The size of the epoch's deme at `time`.
    ///
    /// Evaluation is defined over the closed interval
    /// `[end_time, start_time]`, so both boundary sizes are
    /// returned exactly.  When two epochs of a deme share a
    /// boundary instant, [`ForwardGraph`](crate::ForwardGraph)
    /// resolves the tie in favor of the more recent epoch.
    ///
    /// # Errors
    ///
    /// [`DemographyError::Domain`] if `time` lies outside the
    /// interval, or if `start_time` is infinite and the size
    /// function is not constant.
    pub fn size_at<F: Into<f64>>(&self, time: F) -> Result<DemeSize, DemographyError> {
        let time: f64 = time.into();
        if time.is_nan() {
            return Err(DemographyError::Domain("time is NaN".to_string()));
        }
        let start_time: f64 = self.start_time().into();
        let end_time: f64 = self.end_time().into();

        if start_time.is_infinite() {
            return match self.size_function() {
                SizeFunction::Constant if time >= end_time => Ok(self.start_size()),
                SizeFunction::Constant => Err(DemographyError::Domain(format!(
                    "time {time} is more recent than the epoch end time {end_time}"
                ))),
                function => Err(DemographyError::Domain(format!(
                    "cannot evaluate a {function} size function over an unbounded epoch"
                ))),
            };
        }

        if time < end_time || time > start_time {
            return Err(DemographyError::Domain(format!(
                "time {time} is not contained in the epoch interval [{end_time}, {start_time}]"
            )));
        }
        // exact boundary sizes, no floating accumulation
        if time == start_time {
            return Ok(self.start_size());
        }
        if time == end_time {
            return Ok(self.end_size());
        }

        let start_size: f64 = self.start_size().into();
        let end_size: f64 = self.end_size().into();
        let progress = (start_time - time) / (start_time - end_time);
        let size = match self.size_function() {
            SizeFunction::Constant => return Ok(self.start_size()),
            SizeFunction::Exponential => start_size * (end_size / start_size).powf(progress),
            SizeFunction::Logistic => {
                let sigmoid = |x: f64| 1.0 / (1.0 + (-LOGISTIC_STEEPNESS * (x - 0.5)).exp());
                let floor = sigmoid(0.0);
                let span = sigmoid(1.0) - floor;
                start_size + (end_size - start_size) * (sigmoid(progress) - floor) / span
            }
        };
        DemeSize::try_from(size).map_err(|_| {
            DemographyError::Domain(format!(
                "size calculation produced an invalid size: {size}"
            ))
        })
    }
}
