use std::sync::Arc;

use anyhow::Result;

// One deme whose size doubles 50 generations before the present.
const MODEL: &str = "
time_units: generations
demes:
 - name: A
   epochs:
   - start_size: 100
     end_time: 50
   - start_size: 200
";

fn main() -> Result<()> {
    let model = Arc::new(forward_demography::loads(MODEL, 100.0)?);

    let mut graph = forward_demography::ForwardGraph::new();
    graph.initialize_from_model(model)?;
    graph.initialize_time_iteration()?;
    while let Some(time) = graph.iterate_time()? {
        graph.update_state(time)?;
        let sizes = graph.parental_deme_sizes()?;
        println!("{time} {}", sizes[0]);
    }
    assert!(!graph.is_error_state());
    Ok(())
}
