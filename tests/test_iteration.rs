use std::sync::Arc;

use forward_demography::{DemographyError, ForwardGraph};

fn initialized_graph(yaml: &str, resolution: f64) -> ForwardGraph {
    let model = Arc::new(forward_demography::loads(yaml, resolution).unwrap());
    let mut graph = ForwardGraph::new();
    graph.initialize_from_model(model).unwrap();
    graph.initialize_time_iteration().unwrap();
    graph
}

fn collect_trajectory(graph: &mut ForwardGraph) -> Vec<(f64, Vec<f64>)> {
    let mut trajectory = vec![];
    while let Some(time) = graph.iterate_time().unwrap() {
        graph.update_state(time).unwrap();
        trajectory.push((
            time.into(),
            graph.parental_deme_sizes().unwrap().to_vec(),
        ));
    }
    trajectory
}

#[test]
fn one_deme_two_epoch_trajectory() {
    let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 100
     end_time: 50
   - start_size: 200
";
    let mut graph = initialized_graph(yaml, 100.0);
    let trajectory = collect_trajectory(&mut graph);
    let times: Vec<f64> = trajectory.iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![150.0, 50.0, 0.0]);

    // older than the epoch boundary the size is 100; the
    // boundary instant itself belongs to the newer epoch
    assert_eq!(trajectory[0].1, vec![100.0]);
    assert_eq!(trajectory[1].1, vec![200.0]);
    assert_eq!(trajectory[2].1, vec![200.0]);

    // exhaustion is not an error, but iterating past it is
    assert!(!graph.is_error_state());
    assert!(graph.iterate_time().is_err());
}

#[test]
fn iterated_times_strictly_decrease() {
    let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 1000
     end_time: 700
   - start_size: 500
     end_size: 1500
     end_time: 100
   - start_size: 1500
 - name: B
   ancestors: [A]
   start_time: 700
   epochs:
   - start_size: 300
pulses:
 - source: A
   dest: B
   proportion: 0.5
   time: 400
";
    let mut graph = initialized_graph(yaml, 50.0);
    let mut times = vec![];
    while let Some(time) = graph.iterate_time().unwrap() {
        graph.update_state(time).unwrap();
        times.push(f64::from(time));
    }
    assert!(!times.is_empty());
    assert!(times.windows(2).all(|w| w[0] > w[1]));
    let mut deduplicated = times.clone();
    deduplicated.dedup();
    assert_eq!(times, deduplicated);
}

#[test]
fn migration_window_boundaries() {
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
   start_time: 30
   end_time: 10
";
    let mut graph = initialized_graph(yaml, 100.0);
    let source = 0;
    let dest = 1;
    let mut seen = vec![];
    while let Some(time) = graph.iterate_time().unwrap() {
        graph.update_state(time).unwrap();
        let rate = graph.migration_matrix().unwrap()[[dest, source]];
        seen.push((f64::from(time), rate));
    }
    // schedule: 130 (resolved start), 30, 10, 0; the rate
    // applies on [10, 30): absent at 30, present at 10
    assert_eq!(
        seen,
        vec![(130.0, 0.0), (30.0, 0.0), (10.0, 0.01), (0.0, 0.0)]
    );
}

#[test]
fn pulse_applies_only_at_its_instant() {
    let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 100
 - name: B
   epochs:
   - start_size: 100
pulses:
 - source: A
   dest: B
   proportion: 0.25
   time: 10
";
    let mut graph = initialized_graph(yaml, 100.0);
    while let Some(time) = graph.iterate_time().unwrap() {
        graph.update_state(time).unwrap();
        let b_ancestry = graph.ancestry_proportions(1).unwrap();
        if time == 10.0 {
            assert_eq!(b_ancestry[0], 0.25);
            assert_eq!(b_ancestry[1], 0.75);
        } else {
            assert_eq!(b_ancestry[0], 0.0);
            assert_eq!(b_ancestry[1], 1.0);
        }
        // the source deme's own ancestry is untouched
        let a_ancestry = graph.ancestry_proportions(0).unwrap();
        assert_eq!(a_ancestry[0], 1.0);
        assert_eq!(a_ancestry[1], 0.0);
    }
}

#[test]
fn successor_deme_is_absent_before_its_start() {
    let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 1000
     end_time: 500
 - name: B
   ancestors: [A]
   epochs:
   - start_size: 300
";
    let mut graph = initialized_graph(yaml, 100.0);
    let trajectory = collect_trajectory(&mut graph);
    let times: Vec<f64> = trajectory.iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![600.0, 500.0, 0.0]);
    // before 500, B does not exist and reports size 0
    assert_eq!(trajectory[0].1, vec![1000.0, 0.0]);
    // the handoff instant: A's final generation and B's first
    assert_eq!(trajectory[1].1, vec![1000.0, 300.0]);
    assert_eq!(trajectory[2].1, vec![0.0, 300.0]);
}

#[test]
fn founding_ancestry_reported_at_deme_start() {
    let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 1000
 - name: B
   epochs:
   - start_size: 1000
 - name: C
   ancestors: [A, B]
   proportions: [0.6, 0.4]
   start_time: 200
   epochs:
   - start_size: 100
";
    let mut graph = initialized_graph(yaml, 100.0);
    while let Some(time) = graph.iterate_time().unwrap() {
        graph.update_state(time).unwrap();
        let c_ancestry = graph.ancestry_proportions(2).unwrap();
        if time == 200.0 {
            assert_eq!(c_ancestry[0], 0.6);
            assert_eq!(c_ancestry[1], 0.4);
            assert_eq!(c_ancestry[2], 0.0);
        } else if f64::from(time) < 200.0 {
            assert_eq!(c_ancestry[2], 1.0);
        } else {
            // C not alive yet
            assert_eq!(c_ancestry[2], 0.0);
        }
    }
}

#[test]
fn exponential_growth_is_sampled_at_schedule_points() {
    let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 100
     end_time: 50
   - start_size: 100
     end_size: 200
";
    let mut graph = initialized_graph(yaml, 100.0);
    let trajectory = collect_trajectory(&mut graph);
    assert_eq!(trajectory[0], (150.0, vec![100.0]));
    assert_eq!(trajectory[1], (50.0, vec![100.0]));
    assert_eq!(trajectory[2], (0.0, vec![200.0]));
}

#[test]
fn graphs_share_one_model() {
    let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 100
     end_time: 50
   - start_size: 200
";
    let model = Arc::new(forward_demography::loads(yaml, 100.0).unwrap());
    let mut first = ForwardGraph::new();
    let mut second = ForwardGraph::new();
    first.initialize_from_model(model.clone()).unwrap();
    second.initialize_from_model(model.clone()).unwrap();
    first.initialize_time_iteration().unwrap();
    second.initialize_time_iteration().unwrap();

    // iterate the first graph to completion, then the second;
    // the shared model is unaffected by either cursor
    let first_trajectory = collect_trajectory(&mut first);
    let second_trajectory = collect_trajectory(&mut second);
    assert_eq!(first_trajectory, second_trajectory);
    assert_eq!(model.num_demes(), 1);
}

#[test]
fn errored_graph_stays_errored() {
    let yaml = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 100
";
    let model = Arc::new(forward_demography::loads(yaml, 100.0).unwrap());
    let mut graph = ForwardGraph::new();
    graph.initialize_from_model(model).unwrap();
    graph.initialize_time_iteration().unwrap();
    graph.iterate_time().unwrap().unwrap();

    let first = graph.update_state(123.0).unwrap_err();
    assert!(matches!(first, DemographyError::Sequence(_)));
    assert!(graph.is_error_state());
    for _ in 0..3 {
        assert_eq!(graph.update_state(123.0).unwrap_err(), first);
        assert_eq!(graph.iterate_time().unwrap_err(), first);
        assert!(graph.parental_deme_sizes().is_err());
        assert!(graph.is_error_state());
    }
}

#[test]
fn model_is_queryable_through_the_graph() {
    let yaml = "
time_units: generations
description: one deme, two epochs
demes:
 - name: A
   epochs:
   - start_size: 100
     end_time: 50
   - start_size: 200
";
    let model = Arc::new(forward_demography::loads(yaml, 100.0).unwrap());
    let mut graph = ForwardGraph::new();
    assert!(graph.model().is_none());
    graph.initialize_from_model(model).unwrap();
    let bound = graph.model().unwrap();
    assert_eq!(bound.time_units(), "generations");
    assert_eq!(bound.description(), Some("one deme, two epochs"));
    assert_eq!(graph.event_schedule().unwrap().len(), 3);
}
