//! # Forward-time iteration of declarative demographic models.
//!
//! A demographic model describes a set of populations
//! ("demes"), each with a piecewise size trajectory, plus
//! time-bounded migration rates and instantaneous admixture
//! pulses.  This crate loads such a model from its YAML text
//! form, compiles the distinguished time points into an
//! [`EventSchedule`], and iterates forwards through time from
//! the oldest resolved time towards the present (time counts
//! down to 0), materializing a per-deme size snapshot at every
//! stop.
//!
//! ```
//! use std::sync::Arc;
//!
//! let yaml = "
//! time_units: generations
//! demes:
//!  - name: A
//!    epochs:
//!    - start_size: 100
//!      end_time: 50
//!    - start_size: 200
//! ";
//! // 100.0 resolves the unbounded past into a finite start time
//! let model = Arc::new(forward_demography::loads(yaml, 100.0)?);
//! let mut graph = forward_demography::ForwardGraph::new();
//! graph.initialize_from_model(model)?;
//! graph.initialize_time_iteration()?;
//! while let Some(time) = graph.iterate_time()? {
//!     graph.update_state(time)?;
//!     let sizes = graph.parental_deme_sizes()?;
//!     assert!(sizes[0] > 0.0);
//! }
//! # Ok::<(), forward_demography::DemographyError>(())
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

mod macros;

mod deme_size;
mod error;
mod graph;
mod migration_rate;
mod model;
mod proportion;
mod schedule;
mod size_function;
mod time;

pub use deme_size::DemeSize;
pub use error::DemographyError;
pub use graph::ForwardGraph;
pub use migration_rate::MigrationRate;
pub use model::{AsymmetricMigration, Deme, Epoch, ModelDocument, Pulse};
pub use proportion::Proportion;
pub use schedule::EventSchedule;
pub use size_function::SizeFunction;
pub use time::{Time, TimeInterval};

/// Load a validated [`ModelDocument`] from YAML text.
///
/// `resolution` is a positive, finite burn-in length used to
/// discretize the unbounded past: when any deme extends to
/// infinity, iteration starts `resolution` time units before
/// the model's oldest finite event.
///
/// # Errors
///
/// [`DemographyError::Yaml`] for parse failures and
/// [`DemographyError::Validation`] for inconsistent models.
pub fn loads(yaml: &str, resolution: f64) -> Result<ModelDocument, DemographyError> {
    ModelDocument::new_resolved_from_str(yaml, resolution)
}

/// Load a validated [`ModelDocument`] from a reader.
///
/// See [`loads`] for the meaning of `resolution`.
pub fn load<R: std::io::Read>(reader: R, resolution: f64) -> Result<ModelDocument, DemographyError> {
    ModelDocument::new_resolved_from_reader(reader, resolution)
}
