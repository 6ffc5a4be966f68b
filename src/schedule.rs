//! Compilation of a model into its distinguished time points.

use crate::error::DemographyError;
use crate::model::ModelDocument;
use crate::time::Time;

/// The ordered set of time points at which model state can
/// change discontinuously: epoch boundaries, migration-interval
/// boundaries, pulse times, and the model's global span.
///
/// Times are strictly decreasing (oldest first), deduplicated,
/// and always finite: boundaries at infinity are replaced by
/// the model's resolved [`oldest_time`](ModelDocument::oldest_time).
/// Immutable once built.
#[derive(Clone, Debug)]
pub struct EventSchedule {
    times: Vec<Time>,
}

impl EventSchedule {
    /// Compile the schedule for a resolved model.
    ///
    /// # Errors
    ///
    /// [`DemographyError::Schedule`] if the schedule collapses
    /// to fewer than two distinct points, or if any point lies
    /// outside every deme's existence.
    pub fn build(model: &ModelDocument) -> Result<Self, DemographyError> {
        let oldest: f64 = model.oldest_time().into();
        let clamp = |time: f64| if time.is_finite() { time } else { oldest };

        let mut times: Vec<f64> = vec![oldest, model.most_recent_time().into()];
        for deme in model.demes() {
            for epoch in deme.epochs() {
                times.push(clamp(epoch.start_time().into()));
                times.push(epoch.end_time().into());
            }
        }
        for migration in model.migrations() {
            times.push(clamp(migration.start_time().into()));
            times.push(migration.end_time().into());
        }
        for pulse in model.pulses() {
            times.push(pulse.time().into());
        }

        times.sort_by(|a, b| b.total_cmp(a));
        times.dedup();

        if times.len() < 2 {
            return Err(DemographyError::Schedule(format!(
                "degenerate event schedule: {} distinct time point(s)",
                times.len()
            )));
        }
        for time in &times {
            if !model.demes().iter().any(|deme| deme.exists_at(*time)) {
                return Err(DemographyError::Schedule(format!(
                    "time point {time} lies outside every deme's existence"
                )));
            }
        }

        let times = times
            .into_iter()
            .map(Time::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| DemographyError::Schedule(error.to_string()))?;
        Ok(Self { times })
    }

    /// The time points, strictly decreasing.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Number of time points.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// `true` when the schedule holds no time points.  A built
    /// schedule never is; this exists for slice-like parity.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(yaml: &str) -> EventSchedule {
        let model = ModelDocument::new_resolved_from_str(yaml, 100.0).unwrap();
        EventSchedule::build(&model).unwrap()
    }

    fn as_f64(schedule: &EventSchedule) -> Vec<f64> {
        schedule.times().iter().map(|t| f64::from(*t)).collect()
    }

    #[test]
    fn two_epoch_model_schedule() {
        let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 100
     end_time: 50
   - start_size: 200
";
        let schedule = build(yaml);
        assert_eq!(as_f64(&schedule), vec![150.0, 50.0, 0.0]);
    }

    #[test]
    fn times_are_strictly_decreasing_and_deduplicated() {
        let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 100
     end_time: 50
   - start_size: 200
 - name: B
   ancestors: [A]
   start_time: 50
   epochs:
   - start_size: 100
migrations:
 - source: A
   dest: B
   rate: 0.01
   start_time: 50
   end_time: 10
pulses:
 - source: A
   dest: B
   proportion: 0.25
   time: 10
";
        let schedule = build(yaml);
        let times = as_f64(&schedule);
        // deme boundaries at 150/50/0, migration at 50/10, pulse at 10
        assert_eq!(times, vec![150.0, 50.0, 10.0, 0.0]);
        assert!(times.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn unbounded_migration_is_clamped_to_oldest_time() {
        let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 100
 - name: B
   epochs:
   - start_size: 100
migrations:
 - source: A
   dest: B
   rate: 0.01
   end_time: 25
";
        let schedule = build(yaml);
        let times = as_f64(&schedule);
        assert!(times.iter().all(|t| t.is_finite()));
        assert_eq!(times, vec![125.0, 25.0, 0.0]);
    }
}
