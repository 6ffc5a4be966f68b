//! The stateful forward-iteration engine.

use std::sync::Arc;

use ndarray::{Array2, ArrayView1};

use crate::error::DemographyError;
use crate::model::ModelDocument;
use crate::schedule::EventSchedule;
use crate::time::Time;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Initialized,
    Iterating,
    Completed,
    Errored,
}

/// Forward-in-time iteration over a demographic model.
///
/// A graph walks the model's [`EventSchedule`] from the oldest
/// resolved time towards the present, materializing a per-deme
/// size snapshot, the active migration-rate matrix, and the
/// per-deme ancestry proportions at each stop.
///
/// The lifecycle is `new` → [`initialize_from_model`] →
/// [`initialize_time_iteration`] → alternating calls to
/// [`iterate_time`] and [`update_state`].  The first error
/// freezes the graph: every later mutating call re-reports it,
/// and only [`is_error_state`] and dropping remain safe.
///
/// [`initialize_from_model`]: ForwardGraph::initialize_from_model
/// [`initialize_time_iteration`]: ForwardGraph::initialize_time_iteration
/// [`iterate_time`]: ForwardGraph::iterate_time
/// [`update_state`]: ForwardGraph::update_state
/// [`is_error_state`]: ForwardGraph::is_error_state
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// let yaml = "
/// time_units: generations
/// demes:
///  - name: A
///    epochs:
///    - start_size: 100
///      end_time: 50
///    - start_size: 200
/// ";
/// let model = Arc::new(forward_demography::loads(yaml, 100.0).unwrap());
/// let mut graph = forward_demography::ForwardGraph::new();
/// graph.initialize_from_model(model).unwrap();
/// graph.initialize_time_iteration().unwrap();
/// let mut sizes = vec![];
/// while let Some(time) = graph.iterate_time().unwrap() {
///     graph.update_state(time).unwrap();
///     sizes.push(graph.parental_deme_sizes().unwrap()[0]);
/// }
/// assert_eq!(sizes, vec![100.0, 200.0, 200.0]);
/// ```
#[derive(Debug)]
pub struct ForwardGraph {
    model: Option<Arc<ModelDocument>>,
    schedule: Option<EventSchedule>,
    state: Lifecycle,
    cursor: usize,
    last_time_returned: Option<Time>,
    last_time_updated: Option<Time>,
    deme_sizes: Vec<f64>,
    migration_matrix: Array2<f64>,
    ancestry_proportions: Array2<f64>,
    error: Option<DemographyError>,
}

impl Default for ForwardGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ForwardGraph {
    /// An empty graph with no model bound.
    pub fn new() -> Self {
        Self {
            model: None,
            schedule: None,
            state: Lifecycle::Uninitialized,
            cursor: 0,
            last_time_returned: None,
            last_time_updated: None,
            deme_sizes: vec![],
            migration_matrix: Array2::zeros((0, 0)),
            ancestry_proportions: Array2::zeros((0, 0)),
            error: None,
        }
    }

    fn fail(&mut self, error: DemographyError) -> DemographyError {
        self.state = Lifecycle::Errored;
        self.error = Some(error.clone());
        error
    }

    fn check_sticky(&self) -> Result<(), DemographyError> {
        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn attached_model(&mut self) -> Result<Arc<ModelDocument>, DemographyError> {
        match &self.model {
            Some(model) => Ok(model.clone()),
            None => Err(self.fail(DemographyError::Sequence(
                "no model attached to the graph".to_string(),
            ))),
        }
    }

    /// Bind a model and compile its event schedule.
    ///
    /// Valid only on a freshly allocated graph.
    pub fn initialize_from_model(
        &mut self,
        model: Arc<ModelDocument>,
    ) -> Result<(), DemographyError> {
        self.check_sticky()?;
        if self.state != Lifecycle::Uninitialized {
            return Err(self.fail(DemographyError::Sequence(
                "initialize_from_model requires an uninitialized graph".to_string(),
            )));
        }
        let schedule = match EventSchedule::build(&model) {
            Ok(schedule) => schedule,
            Err(error) => return Err(self.fail(error)),
        };
        let num_demes = model.num_demes();
        self.deme_sizes = vec![0.0; num_demes];
        self.migration_matrix = Array2::zeros((num_demes, num_demes));
        self.ancestry_proportions = Array2::zeros((num_demes, num_demes));
        self.model = Some(model);
        self.schedule = Some(schedule);
        self.state = Lifecycle::Initialized;
        Ok(())
    }

    /// Reset the cursor to the oldest schedule time point.
    pub fn initialize_time_iteration(&mut self) -> Result<(), DemographyError> {
        self.check_sticky()?;
        if self.state != Lifecycle::Initialized {
            return Err(self.fail(DemographyError::Sequence(
                "initialize_time_iteration requires an initialized graph".to_string(),
            )));
        }
        self.cursor = 0;
        self.last_time_returned = None;
        self.last_time_updated = None;
        self.state = Lifecycle::Iterating;
        Ok(())
    }

    /// Advance to the next schedule time point.
    ///
    /// Returns `Ok(None)` when the schedule is exhausted; the
    /// graph then moves to its completed state and further
    /// calls are sequence errors.  This operation never changes
    /// deme sizes; pair each returned time with a call to
    /// [`update_state`](ForwardGraph::update_state).
    pub fn iterate_time(&mut self) -> Result<Option<Time>, DemographyError> {
        self.check_sticky()?;
        if self.state != Lifecycle::Iterating {
            let message = match self.state {
                Lifecycle::Completed => "iterate_time called after iteration completed",
                _ => "iterate_time requires initialize_time_iteration",
            };
            return Err(self.fail(DemographyError::Sequence(message.to_string())));
        }
        let schedule = match &self.schedule {
            Some(schedule) => schedule,
            None => {
                return Err(self.fail(DemographyError::Sequence(
                    "no schedule attached to the graph".to_string(),
                )))
            }
        };
        match schedule.times().get(self.cursor) {
            Some(time) => {
                let time = *time;
                self.cursor += 1;
                self.last_time_returned = Some(time);
                Ok(Some(time))
            }
            None => {
                self.state = Lifecycle::Completed;
                Ok(None)
            }
        }
    }

    /// Recompute the per-deme state at `time`.
    ///
    /// `time` must equal the value most recently returned by
    /// [`iterate_time`](ForwardGraph::iterate_time); anything
    /// else is a sequence error and leaves the previous sizes
    /// untouched.  For every deme existing at `time` the active
    /// epoch's size is evaluated, the migration-rate matrix is
    /// rebuilt, and any pulse scheduled at exactly `time` is
    /// applied to the destination deme's ancestry proportions.
    pub fn update_state<T: Into<f64>>(&mut self, time: T) -> Result<(), DemographyError> {
        self.check_sticky()?;
        if self.state != Lifecycle::Iterating {
            return Err(self.fail(DemographyError::Sequence(
                "update_state requires active time iteration".to_string(),
            )));
        }
        let time: f64 = time.into();
        let expected: f64 = match self.last_time_returned {
            Some(returned) => returned.into(),
            None => {
                return Err(self.fail(DemographyError::Sequence(
                    "update_state called before the first iterate_time".to_string(),
                )));
            }
        };
        if time != expected {
            return Err(self.fail(DemographyError::Sequence(format!(
                "update_state time {time} does not match the current iteration time {expected}"
            ))));
        }
        let model = self.attached_model()?;

        self.migration_matrix.fill(0.0);
        self.ancestry_proportions.fill(0.0);
        for (index, deme) in model.demes().iter().enumerate() {
            if !deme.exists_at(time) {
                self.deme_sizes[index] = 0.0;
                continue;
            }
            // shared boundary instants belong to the newer epoch
            let epoch = match deme
                .epochs()
                .iter()
                .rev()
                .find(|epoch| epoch.time_interval().contains_inclusive(time))
            {
                Some(epoch) => epoch,
                None => {
                    return Err(self.fail(DemographyError::Domain(format!(
                        "no epoch of deme {} spans time {time}",
                        deme.name()
                    ))));
                }
            };
            let size = match epoch.size_at(time) {
                Ok(size) => size,
                Err(error) => return Err(self.fail(error)),
            };
            self.deme_sizes[index] = size.into();

            if deme.start_time() == time && !deme.ancestor_indexes().is_empty() {
                for (ancestor, proportion) in deme
                    .ancestor_indexes()
                    .iter()
                    .zip(deme.proportions().iter())
                {
                    self.ancestry_proportions[[index, *ancestor]] = f64::from(*proportion);
                }
            } else {
                self.ancestry_proportions[[index, index]] = 1.0;
            }
        }

        for migration in model.migrations() {
            if migration.time_interval().contains_exclusive_start(time) {
                self.migration_matrix[[migration.dest(), migration.source()]] =
                    migration.rate().into();
            }
        }

        for pulse in model.pulses().iter().filter(|pulse| pulse.time() == time) {
            let proportion: f64 = pulse.proportion().into();
            let mut row = self.ancestry_proportions.row_mut(pulse.dest());
            row.mapv_inplace(|value| value * (1.0 - proportion));
            row[pulse.source()] += proportion;
        }

        self.last_time_updated = self.last_time_returned;
        Ok(())
    }

    /// The per-deme sizes computed by the last
    /// [`update_state`](ForwardGraph::update_state), in model
    /// deme order.  Demes not alive at that time report `0.0`.
    pub fn parental_deme_sizes(&self) -> Result<&[f64], DemographyError> {
        self.queryable()?;
        Ok(&self.deme_sizes)
    }

    /// The active migration-rate matrix at the last updated
    /// time.  Row = destination deme, column = source deme.
    pub fn migration_matrix(&self) -> Result<&Array2<f64>, DemographyError> {
        self.queryable()?;
        Ok(&self.migration_matrix)
    }

    /// One deme's ancestry proportions at the last updated
    /// time, indexed by source deme.
    pub fn ancestry_proportions(
        &self,
        deme_index: usize,
    ) -> Result<ArrayView1<'_, f64>, DemographyError> {
        self.queryable()?;
        if deme_index >= self.ancestry_proportions.nrows() {
            return Err(DemographyError::Validation(format!(
                "invalid deme index: {deme_index}"
            )));
        }
        Ok(self.ancestry_proportions.row(deme_index))
    }

    fn queryable(&self) -> Result<(), DemographyError> {
        self.check_sticky()?;
        if self.last_time_updated.is_none() {
            return Err(DemographyError::Sequence(
                "no state has been computed by update_state".to_string(),
            ));
        }
        Ok(())
    }

    /// The time passed to the last successful
    /// [`update_state`](ForwardGraph::update_state), if any.
    pub fn last_time_updated(&self) -> Option<Time> {
        self.last_time_updated
    }

    /// `true` once any operation has failed.  Never fails and
    /// never mutates.
    pub fn is_error_state(&self) -> bool {
        self.error.is_some()
    }

    /// The sticky diagnostic, if the graph is in the error state.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|error| error.to_string())
    }

    /// The bound model, once initialized.
    pub fn model(&self) -> Option<&ModelDocument> {
        self.model.as_deref()
    }

    /// The compiled schedule, once initialized.
    pub fn event_schedule(&self) -> Option<&EventSchedule> {
        self.schedule.as_ref()
    }
}
