use thiserror::Error;

/// Error type for this crate.
///
/// Each variant corresponds to one failure category of the
/// engine: model validation, schedule construction, lifecycle
/// sequencing, and size-function evaluation.
///
/// # Example
///
/// This input is rejected because the deme starts at a finite
/// time without naming any ancestors:
///
/// ```
/// let yaml = "
/// time_units: generations
/// demes:
///  - name: A
///    start_time: 55
///    epochs:
///     - start_size: 100
/// ";
/// assert!(matches!(
///     forward_demography::loads(yaml, 100.0),
///     Err(forward_demography::DemographyError::Validation(_))
/// ));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DemographyError {
    /// Malformed or internally inconsistent model input.
    #[error("{0}")]
    Validation(String),
    /// Degenerate or inconsistent event schedule.
    #[error("{0}")]
    Schedule(String),
    /// Operation invoked outside its valid lifecycle state.
    #[error("{0}")]
    Sequence(String),
    /// Size-function evaluation outside its defined domain.
    #[error("{0}")]
    Domain(String),
    /// Errors coming from `serde_yaml`, stored as text so the
    /// enum stays cloneable for sticky-error re-reporting.
    #[error("yaml error: {0}")]
    Yaml(String),
}

impl From<serde_yaml::Error> for DemographyError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value.to_string())
    }
}
