//! The validated, immutable in-memory demographic model.
//!
//! Input text is deserialized into "unresolved" records that
//! mirror the YAML layout, then resolved field-by-field into
//! the immutable types consumed by the engine.  All validation
//! happens during resolution; the resolved types cannot
//! represent an inconsistent model.

use std::sync::Arc;

use serde::Deserialize;

use crate::deme_size::DemeSize;
use crate::error::DemographyError;
use crate::migration_rate::MigrationRate;
use crate::proportion::Proportion;
use crate::size_function::SizeFunction;
use crate::time::{Time, TimeInterval};

const PROPORTION_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnresolvedEpoch {
    end_time: Option<f64>,
    start_size: Option<f64>,
    end_size: Option<f64>,
    size_function: Option<SizeFunction>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnresolvedDeme {
    name: String,
    #[allow(dead_code)]
    description: Option<String>,
    start_time: Option<f64>,
    #[serde(default)]
    ancestors: Vec<String>,
    proportions: Option<Vec<f64>>,
    epochs: Vec<UnresolvedEpoch>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnresolvedMigration {
    source: String,
    dest: String,
    rate: f64,
    start_time: Option<f64>,
    end_time: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnresolvedPulse {
    source: String,
    dest: String,
    proportion: f64,
    time: f64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnresolvedModel {
    time_units: String,
    description: Option<String>,
    demes: Vec<UnresolvedDeme>,
    #[serde(default)]
    migrations: Vec<UnresolvedMigration>,
    #[serde(default)]
    pulses: Vec<UnresolvedPulse>,
}

/// One size-function regime within a deme's existence.
///
/// Epochs cover `[end_time, start_time]` with time decreasing
/// towards the present.  Consecutive epochs of a deme share a
/// boundary instant; the boundary belongs to the more recent
/// epoch when the engine looks up sizes.
#[derive(Clone, Copy, Debug)]
pub struct Epoch {
    start_time: Time,
    end_time: Time,
    start_size: DemeSize,
    end_size: DemeSize,
    size_function: SizeFunction,
}

impl Epoch {
    /// The resolved start time (the older boundary).
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// The resolved end time (the more recent boundary).
    pub fn end_time(&self) -> Time {
        self.end_time
    }

    /// The resolved size at `start_time`.
    pub fn start_size(&self) -> DemeSize {
        self.start_size
    }

    /// The resolved size at `end_time`.
    pub fn end_size(&self) -> DemeSize {
        self.end_size
    }

    /// The resolved size function.
    pub fn size_function(&self) -> SizeFunction {
        self.size_function
    }

    /// The resolved time interval.
    pub fn time_interval(&self) -> TimeInterval {
        TimeInterval::new(self.start_time, self.end_time)
    }
}

/// A population with its own size trajectory.
#[derive(Clone, Debug)]
pub struct Deme {
    name: Arc<str>,
    start_time: Time,
    ancestors: Vec<usize>,
    proportions: Vec<Proportion>,
    epochs: Vec<Epoch>,
}

impl Deme {
    /// The deme's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The time at which the deme comes into existence.
    /// Infinite for a deme extending into the unbounded past.
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// The time at which the deme ceases to exist, taken from
    /// its final epoch.
    pub fn end_time(&self) -> Time {
        // a resolved deme always has at least one epoch
        match self.epochs.last() {
            Some(epoch) => epoch.end_time(),
            None => Time::infinity(),
        }
    }

    /// The deme's epochs, oldest first.
    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    /// Number of epochs.
    pub fn num_epochs(&self) -> usize {
        self.epochs.len()
    }

    /// Indexes of the deme's ancestors into the model's deme
    /// ordering.  Empty for demes with an unbounded past.
    pub fn ancestor_indexes(&self) -> &[usize] {
        &self.ancestors
    }

    /// Ancestry proportions, parallel to
    /// [`ancestor_indexes`](Deme::ancestor_indexes).
    pub fn proportions(&self) -> &[Proportion] {
        &self.proportions
    }

    /// The deme's existence interval.
    pub fn time_interval(&self) -> TimeInterval {
        TimeInterval::new(self.start_time, self.end_time())
    }

    /// Existence over the closed interval `[end_time, start_time]`.
    pub fn exists_at<T: Into<f64>>(&self, time: T) -> bool {
        self.time_interval().contains_inclusive(time)
    }
}

/// A directional, time-bounded migration rate between two demes.
#[derive(Clone, Copy, Debug)]
pub struct AsymmetricMigration {
    source: usize,
    dest: usize,
    rate: MigrationRate,
    interval: TimeInterval,
}

impl AsymmetricMigration {
    /// Index of the source deme.
    pub fn source(&self) -> usize {
        self.source
    }

    /// Index of the destination deme.
    pub fn dest(&self) -> usize {
        self.dest
    }

    /// The migration rate.
    pub fn rate(&self) -> MigrationRate {
        self.rate
    }

    /// The interval during which the rate applies.  The rate is
    /// active for `end_time <= t < start_time`.
    pub fn time_interval(&self) -> TimeInterval {
        self.interval
    }

    /// The oldest boundary of the interval.
    pub fn start_time(&self) -> Time {
        self.interval.start_time()
    }

    /// The most recent boundary of the interval.
    pub fn end_time(&self) -> Time {
        self.interval.end_time()
    }
}

/// An instantaneous bulk migration event.
#[derive(Clone, Copy, Debug)]
pub struct Pulse {
    source: usize,
    dest: usize,
    proportion: Proportion,
    time: Time,
}

impl Pulse {
    /// Index of the source deme.
    pub fn source(&self) -> usize {
        self.source
    }

    /// Index of the destination deme.
    pub fn dest(&self) -> usize {
        self.dest
    }

    /// Proportion of the destination replaced by migrants.
    pub fn proportion(&self) -> Proportion {
        self.proportion
    }

    /// The single time point of the event.
    pub fn time(&self) -> Time {
        self.time
    }
}

/// The validated, immutable demographic model.
///
/// Built once by [`loads`](crate::loads) or
/// [`load`](crate::load) and never mutated afterwards, so it
/// can be shared (via [`Arc`]) by any number of
/// [`ForwardGraph`](crate::ForwardGraph) instances.
#[derive(Clone, Debug)]
pub struct ModelDocument {
    time_units: String,
    description: Option<String>,
    demes: Vec<Deme>,
    migrations: Vec<AsymmetricMigration>,
    pulses: Vec<Pulse>,
    oldest_time: Time,
    most_recent_time: Time,
}

impl ModelDocument {
    pub(crate) fn new_resolved_from_str(
        yaml: &str,
        resolution: f64,
    ) -> Result<Self, DemographyError> {
        let unresolved: UnresolvedModel = serde_yaml::from_str(yaml)?;
        Self::resolve(unresolved, resolution)
    }

    pub(crate) fn new_resolved_from_reader<R: std::io::Read>(
        reader: R,
        resolution: f64,
    ) -> Result<Self, DemographyError> {
        let unresolved: UnresolvedModel = serde_yaml::from_reader(reader)?;
        Self::resolve(unresolved, resolution)
    }

    /// The model's time-unit label.
    pub fn time_units(&self) -> &str {
        &self.time_units
    }

    /// The optional top-level description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Number of demes.
    pub fn num_demes(&self) -> usize {
        self.demes.len()
    }

    /// The demes, in model order.
    pub fn demes(&self) -> &[Deme] {
        &self.demes
    }

    /// Get a deme by its index in model order.
    pub fn get_deme(&self, index: usize) -> Option<&Deme> {
        self.demes.get(index)
    }

    /// Get a deme by name.
    pub fn get_deme_from_name(&self, name: &str) -> Option<&Deme> {
        self.demes.iter().find(|deme| deme.name() == name)
    }

    /// Get a deme's index in model order by name.
    pub fn deme_index(&self, name: &str) -> Option<usize> {
        self.demes.iter().position(|deme| deme.name() == name)
    }

    /// The resolved migration intervals.
    pub fn migrations(&self) -> &[AsymmetricMigration] {
        &self.migrations
    }

    /// The resolved pulses, oldest first.
    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    /// The resolved, always finite, oldest time of the model.
    ///
    /// When any deme extends into the unbounded past, this is
    /// the most ancient finite event time plus the resolution
    /// parameter passed at load time.
    pub fn oldest_time(&self) -> Time {
        self.oldest_time
    }

    /// The most recent time of the model, usually 0.
    pub fn most_recent_time(&self) -> Time {
        self.most_recent_time
    }

    fn resolve(unresolved: UnresolvedModel, resolution: f64) -> Result<Self, DemographyError> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(DemographyError::Validation(format!(
                "the resolution parameter must be positive and finite, got: {resolution}"
            )));
        }
        if unresolved.time_units.is_empty() {
            return Err(DemographyError::Validation(
                "time_units must not be empty".to_string(),
            ));
        }
        if unresolved.demes.is_empty() {
            return Err(DemographyError::Validation(
                "the model must define at least one deme".to_string(),
            ));
        }

        let mut demes: Vec<Deme> = Vec::with_capacity(unresolved.demes.len());
        for (index, deme) in unresolved.demes.iter().enumerate() {
            let resolved = resolve_deme(index, deme, &unresolved.demes, &demes)?;
            demes.push(resolved);
        }

        let mut migrations: Vec<AsymmetricMigration> = vec![];
        for (index, migration) in unresolved.migrations.iter().enumerate() {
            let resolved = resolve_migration(index, migration, &demes, &migrations)?;
            migrations.push(resolved);
        }

        let mut pulses: Vec<Pulse> = vec![];
        for (index, pulse) in unresolved.pulses.iter().enumerate() {
            pulses.push(resolve_pulse(index, pulse, &demes)?);
        }
        pulses.sort_by(|a, b| b.time.total_cmp(&a.time));

        let (oldest_time, most_recent_time) =
            resolve_global_span(&demes, &migrations, &pulses, resolution)?;

        Ok(Self {
            time_units: unresolved.time_units,
            description: unresolved.description,
            demes,
            migrations,
            pulses,
            oldest_time,
            most_recent_time,
        })
    }
}

fn resolve_deme(
    index: usize,
    deme: &UnresolvedDeme,
    all: &[UnresolvedDeme],
    resolved: &[Deme],
) -> Result<Deme, DemographyError> {
    if deme.name.is_empty() {
        return Err(DemographyError::Validation(format!(
            "deme {index} has an empty name"
        )));
    }
    if all[..index].iter().any(|other| other.name == deme.name) {
        return Err(DemographyError::Validation(format!(
            "duplicate deme name: {}",
            deme.name
        )));
    }

    // Ancestors must be declared earlier in the deme list, so
    // their resolved times are already available here.
    let mut ancestors: Vec<usize> = vec![];
    for ancestor in &deme.ancestors {
        match resolved.iter().position(|d| d.name() == ancestor.as_str()) {
            Some(position) => {
                if ancestors.contains(&position) {
                    return Err(DemographyError::Validation(format!(
                        "deme {} lists ancestor {ancestor} more than once",
                        deme.name
                    )));
                }
                ancestors.push(position);
            }
            None => {
                return Err(DemographyError::Validation(format!(
                    "deme {} names unknown or later-declared ancestor {ancestor}",
                    deme.name
                )));
            }
        }
    }

    let start_time: f64 = match deme.start_time {
        Some(value) => {
            Time::try_from(value)?;
            if value <= 0.0 {
                return Err(DemographyError::Validation(format!(
                    "deme {}: start_time must be > 0.0, got: {value}",
                    deme.name
                )));
            }
            value
        }
        None if ancestors.is_empty() => f64::INFINITY,
        None => {
            // default to the shared end time of all ancestors
            let first = resolved[ancestors[0]].end_time();
            if ancestors
                .iter()
                .any(|a| resolved[*a].end_time() != f64::from(first))
            {
                return Err(DemographyError::Validation(format!(
                    "deme {}: start_time is ambiguous, ancestors end at different times",
                    deme.name
                )));
            }
            first.into()
        }
    };

    if ancestors.is_empty() && start_time.is_finite() {
        return Err(DemographyError::Validation(format!(
            "deme {} has finite start time but no ancestors",
            deme.name
        )));
    }
    if !ancestors.is_empty() && !start_time.is_finite() {
        return Err(DemographyError::Validation(format!(
            "deme {} has ancestors but infinite start time",
            deme.name
        )));
    }
    for ancestor in &ancestors {
        let ancestor = &resolved[*ancestor];
        if !ancestor.exists_at(start_time) {
            return Err(DemographyError::Validation(format!(
                "ancestor {} does not exist at deme {}'s start time {start_time}",
                ancestor.name(),
                deme.name
            )));
        }
    }

    let proportions = resolve_proportions(deme, ancestors.len())?;
    let epochs = resolve_epochs(deme, start_time)?;

    Ok(Deme {
        name: Arc::from(deme.name.as_str()),
        start_time: Time::try_from(start_time)?,
        ancestors,
        proportions,
        epochs,
    })
}

fn resolve_proportions(
    deme: &UnresolvedDeme,
    num_ancestors: usize,
) -> Result<Vec<Proportion>, DemographyError> {
    let proportions: Vec<Proportion> = match &deme.proportions {
        None if num_ancestors == 0 => vec![],
        None if num_ancestors == 1 => vec![Proportion::try_from(1.0)?],
        None => {
            return Err(DemographyError::Validation(format!(
                "deme {}: proportions are required with multiple ancestors",
                deme.name
            )));
        }
        Some(values) => {
            if values.len() != num_ancestors {
                return Err(DemographyError::Validation(format!(
                    "deme {}: got {} proportions for {num_ancestors} ancestors",
                    deme.name,
                    values.len()
                )));
            }
            values
                .iter()
                .map(|value| Proportion::try_from(*value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    if !proportions.is_empty() {
        let sum: f64 = proportions.iter().map(|p| f64::from(*p)).sum();
        if (sum - 1.0).abs() > PROPORTION_SUM_TOLERANCE {
            return Err(DemographyError::Validation(format!(
                "deme {}: ancestry proportions sum to {sum}, not 1.0",
                deme.name
            )));
        }
    }
    Ok(proportions)
}

fn resolve_epochs(deme: &UnresolvedDeme, start_time: f64) -> Result<Vec<Epoch>, DemographyError> {
    if deme.epochs.is_empty() {
        return Err(DemographyError::Validation(format!(
            "deme {} has no epochs",
            deme.name
        )));
    }

    let mut epochs: Vec<Epoch> = Vec::with_capacity(deme.epochs.len());
    let mut current_start = start_time;
    let mut previous_end_size: Option<f64> = None;
    for (index, epoch) in deme.epochs.iter().enumerate() {
        let is_last = index + 1 == deme.epochs.len();
        let end_time = match epoch.end_time {
            Some(value) => value,
            None if is_last => 0.0,
            None => {
                return Err(DemographyError::Validation(format!(
                    "deme {}, epoch {index}: end_time is required before the final epoch",
                    deme.name
                )));
            }
        };
        Time::try_from(end_time)?;
        if !end_time.is_finite() {
            return Err(DemographyError::Validation(format!(
                "deme {}, epoch {index}: end_time must be finite",
                deme.name
            )));
        }
        if end_time >= current_start {
            return Err(DemographyError::Validation(format!(
                "deme {}, epoch {index}: end_time {end_time} does not precede start_time {current_start}",
                deme.name
            )));
        }

        let start_size = match epoch.start_size {
            Some(value) => value,
            None => match previous_end_size {
                Some(size) => size,
                None => match epoch.end_size {
                    Some(value) => value,
                    None => {
                        return Err(DemographyError::Validation(format!(
                            "deme {}, epoch {index}: the first epoch must define start_size or end_size",
                            deme.name
                        )));
                    }
                },
            },
        };
        let end_size = epoch.end_size.unwrap_or(start_size);

        let size_function = match epoch.size_function {
            Some(function) => function,
            None if start_size == end_size => SizeFunction::Constant,
            None => SizeFunction::Exponential,
        };
        let is_constant = matches!(size_function, SizeFunction::Constant);
        if is_constant && start_size != end_size {
            return Err(DemographyError::Validation(format!(
                "deme {}, epoch {index}: constant size function with start_size {start_size} != end_size {end_size}",
                deme.name
            )));
        }
        if !is_constant && start_size == end_size {
            return Err(DemographyError::Validation(format!(
                "deme {}, epoch {index}: {size_function} size function with start_size == end_size",
                deme.name
            )));
        }
        if !is_constant && current_start.is_infinite() {
            return Err(DemographyError::Validation(format!(
                "deme {}, epoch {index}: an epoch starting at infinity must be constant",
                deme.name
            )));
        }

        epochs.push(Epoch {
            start_time: Time::try_from(current_start)?,
            end_time: Time::try_from(end_time)?,
            start_size: DemeSize::try_from(start_size)?,
            end_size: DemeSize::try_from(end_size)?,
            size_function,
        });
        current_start = end_time;
        previous_end_size = Some(end_size);
    }
    Ok(epochs)
}

fn resolve_migration(
    index: usize,
    migration: &UnresolvedMigration,
    demes: &[Deme],
    resolved: &[AsymmetricMigration],
) -> Result<AsymmetricMigration, DemographyError> {
    let (source, dest) = resolve_deme_pair(
        &migration.source,
        &migration.dest,
        demes,
        &format!("migration {index}"),
    )?;
    let rate = MigrationRate::try_from(migration.rate)?;

    let source_deme = &demes[source];
    let dest_deme = &demes[dest];
    let joint_start = f64::from(source_deme.start_time()).min(dest_deme.start_time().into());
    let joint_end = f64::from(source_deme.end_time()).max(dest_deme.end_time().into());

    let start_time = match migration.start_time {
        Some(value) => {
            Time::try_from(value)?;
            value
        }
        None => joint_start,
    };
    let end_time = match migration.end_time {
        Some(value) => {
            Time::try_from(value)?;
            value
        }
        None => joint_end,
    };
    if !end_time.is_finite() {
        return Err(DemographyError::Validation(format!(
            "migration {index}: end_time must be finite"
        )));
    }
    if end_time >= start_time {
        return Err(DemographyError::Validation(format!(
            "migration {index}: end_time {end_time} does not precede start_time {start_time}"
        )));
    }
    if start_time > joint_start || end_time < joint_end {
        return Err(DemographyError::Validation(format!(
            "migration {index}: interval [{end_time}, {start_time}) exceeds the joint existence of {} and {}",
            source_deme.name(),
            dest_deme.name()
        )));
    }

    // Intervals for one ordered pair must not overlap.  Two
    // half-open intervals [e1, s1) and [e2, s2) overlap when
    // e1 < s2 and e2 < s1.
    for other in resolved
        .iter()
        .filter(|m| m.source == source && m.dest == dest)
    {
        let other_start = f64::from(other.start_time());
        let other_end = f64::from(other.end_time());
        if end_time < other_start && other_end < start_time {
            return Err(DemographyError::Validation(format!(
                "migration {index}: interval overlaps an earlier interval for the pair {} -> {}",
                source_deme.name(),
                dest_deme.name()
            )));
        }
    }

    Ok(AsymmetricMigration {
        source,
        dest,
        rate,
        interval: TimeInterval::new(Time::try_from(start_time)?, Time::try_from(end_time)?),
    })
}

fn resolve_pulse(
    index: usize,
    pulse: &UnresolvedPulse,
    demes: &[Deme],
) -> Result<Pulse, DemographyError> {
    let (source, dest) = resolve_deme_pair(
        &pulse.source,
        &pulse.dest,
        demes,
        &format!("pulse {index}"),
    )?;
    let proportion = Proportion::try_from(pulse.proportion)?;
    let time = Time::try_from(pulse.time)?;
    if !time.is_finite() {
        return Err(DemographyError::Validation(format!(
            "pulse {index}: time must be finite"
        )));
    }
    for deme_index in [source, dest] {
        let deme = &demes[deme_index];
        if !deme.exists_at(pulse.time) {
            return Err(DemographyError::Validation(format!(
                "pulse {index}: deme {} does not exist at time {}",
                deme.name(),
                pulse.time
            )));
        }
    }
    Ok(Pulse {
        source,
        dest,
        proportion,
        time,
    })
}

fn resolve_deme_pair(
    source: &str,
    dest: &str,
    demes: &[Deme],
    context: &str,
) -> Result<(usize, usize), DemographyError> {
    let source_index = demes
        .iter()
        .position(|deme| deme.name() == source)
        .ok_or_else(|| {
            DemographyError::Validation(format!("{context}: unknown source deme {source}"))
        })?;
    let dest_index = demes
        .iter()
        .position(|deme| deme.name() == dest)
        .ok_or_else(|| {
            DemographyError::Validation(format!("{context}: unknown dest deme {dest}"))
        })?;
    if source_index == dest_index {
        return Err(DemographyError::Validation(format!(
            "{context}: source and dest demes are both {source}"
        )));
    }
    Ok((source_index, dest_index))
}

fn resolve_global_span(
    demes: &[Deme],
    migrations: &[AsymmetricMigration],
    pulses: &[Pulse],
    resolution: f64,
) -> Result<(Time, Time), DemographyError> {
    // Oldest finite event time: finite deme starts, the first
    // epoch boundary of unbounded demes, finite migration
    // boundaries, and pulse times.
    let mut finite_times: Vec<f64> = vec![];
    for deme in demes {
        let start: f64 = deme.start_time().into();
        if start.is_finite() {
            finite_times.push(start);
        } else if let Some(epoch) = deme.epochs().first() {
            finite_times.push(epoch.end_time().into());
        }
    }
    for migration in migrations {
        let start: f64 = migration.start_time().into();
        if start.is_finite() {
            finite_times.push(start);
        }
        finite_times.push(migration.end_time().into());
    }
    for pulse in pulses {
        finite_times.push(pulse.time().into());
    }
    let oldest_finite = finite_times.iter().fold(0.0_f64, |a, b| a.max(*b));

    let any_unbounded = demes.iter().any(|deme| !deme.start_time().is_finite());
    let oldest_time = if any_unbounded {
        oldest_finite + resolution
    } else {
        oldest_finite
    };
    let most_recent_time = demes
        .iter()
        .map(|deme| f64::from(deme.end_time()))
        .fold(f64::INFINITY, f64::min);

    Ok((
        Time::try_from(oldest_time)?,
        Time::try_from(most_recent_time)?,
    ))
}
