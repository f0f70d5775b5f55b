//! Walkthrough of the engine on a negatively autoregulated gene.
//!
//! Run with `cargo run --example gene_regulation [output.csv]`.

use std::env;

use crn_ssa::{models, Algorithm, Builder, EngineResponse, SaveAt};

fn main() -> crn_ssa::Result<()> {
    // forwards the engine's log records, runtime warnings included
    tracing_subscriber::fmt::init();

    let network = models::gene_regulation()?;
    println!("{}", network);

    // a single path, every event recorded
    let (simulator, _) = Builder::new(&network, 500.0)?.seed(7).build()?;
    let path = simulator.simulate_path()?;
    println!(
        "single path: {} events, stopped by {:?}, final state {:?}",
        path.steps(),
        path.stop_reason(),
        path.final_state().unwrap_or_default()
    );

    // an ensemble on a regular grid
    let (simulator, responses) = Builder::new(&network, 500.0)?
        .algorithm(Algorithm::NextReaction)
        .save_at(SaveAt::Interval(50.0))
        .trials(200)
        .seed(7)
        .runtime(60)
        .build()?;
    let ensemble = simulator.simulate()?;
    let finished = responses
        .try_iter()
        .filter(|response| matches!(response, EngineResponse::TrialFinished { .. }))
        .count();
    println!(
        "ensemble: {} trials ({} reported), complete = {}, took {:?}",
        ensemble.len(),
        finished,
        ensemble.is_complete(),
        ensemble.elapsed()
    );

    let times: Vec<f64> = (0..=10).map(|i| i as f64 * 50.0).collect();
    let summary = ensemble.summary(&times);
    let protein = ensemble.species().iter().position(|s| s == "P").unwrap_or(0);
    for (i, t) in summary.times.iter().enumerate() {
        println!(
            "t = {:>5}  P = {:>8.2} +- {:<8.2}",
            t, summary.mean[i][protein], summary.std[i][protein]
        );
    }

    println!("mRNA at t = 500:");
    for (count, trials) in ensemble.histogram("mRNA", 500.0)? {
        println!("  {:>3} {}", count, "#".repeat(trials));
    }
    println!(
        "P(mRNA extinct at t = 500) = {:.3}",
        ensemble.extinction_probability("mRNA", 500.0)?
    );

    if let Some(file) = env::args().nth(1) {
        summary.to_table().save_csv(&file)?;
        println!("summary written to {}", file);
    }

    Ok(())
}
