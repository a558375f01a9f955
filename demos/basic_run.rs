//! The smallest useful run: tune two hyperparameters of a fake training job.
//!
//! Run with: `cargo run --example basic_run`

use bayesopt::prelude::*;

fn main() -> bayesopt::Result<()> {
    // One continuous and one integer parameter.
    let domain = Domain::builder()
        .continuous("learning_rate", 1e-4, 1e-1)
        .integer("num_layers", 1, 8)
        .build()?;

    let mut opt = BayesOpt::builder(domain)
        .init_points(6)
        .iterations(20)
        .seed(42)
        .build()?;

    // The "training job": validation accuracy peaks at lr = 0.01 with 4
    // layers, plus a little evaluation noise.
    let reason = opt.run(|pars: &Pars| {
        let lr = pars["learning_rate"].as_f64();
        let layers = pars["num_layers"].as_f64();
        let accuracy = 0.95
            - (lr.log10() + 2.0).powi(2) * 0.05
            - (layers - 4.0).powi(2) * 0.01
            + fastrand::f64() * 0.002;
        Ok::<_, Error>(accuracy)
    })?;

    println!("stopped: {reason:?} after {} evaluations", opt.n_observations());

    // Best-so-far trajectory, one line per improvement.
    let mut best_so_far = f64::NEG_INFINITY;
    for row in opt.score_summary() {
        if row.score > best_so_far {
            best_so_far = row.score;
            println!(
                "  iter {:2}  {:?}  accuracy {:.4}  lr {:.5}  layers {}",
                row.iteration,
                row.origin,
                row.score,
                row.pars["learning_rate"].as_f64(),
                row.pars["num_layers"],
            );
        }
    }

    let (best, score) = opt.best_pars().expect("run produced observations");
    println!(
        "best: lr = {:.5}, layers = {}, accuracy = {:.4}",
        best["learning_rate"].as_f64(),
        best["num_layers"],
        score
    );
    for warning in opt.warnings() {
        println!("warning: {warning}");
    }
    Ok(())
}
