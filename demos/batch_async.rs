//! Concurrent batch evaluation for slow scoring functions.
//!
//! Each pass proposes 4 points and evaluates them with up to 4 blocking
//! tasks in flight, so a 50 ms scorer costs roughly one round trip per
//! batch instead of four.
//!
//! Run with: `cargo run --example batch_async --features async`

use std::time::{Duration, Instant};

use bayesopt::prelude::*;

#[tokio::main]
async fn main() -> bayesopt::Result<()> {
    let domain = Domain::builder()
        .continuous("x", -5.0, 5.0)
        .continuous("y", -5.0, 5.0)
        .build()?;

    let mut opt = BayesOpt::builder(domain)
        .init_points(8)
        .iterations(5)
        .batch_size(4)
        .concurrency(4)
        .seed(7)
        .build()?;

    let started = Instant::now();
    let reason = opt
        .run_async(|pars: &Pars| {
            // Stand-in for an expensive simulation or remote call.
            std::thread::sleep(Duration::from_millis(50));
            let x = pars["x"].as_f64();
            let y = pars["y"].as_f64();
            Ok::<_, Error>(-(x * x + y * y))
        })
        .await?;

    let evaluations = opt.n_observations();
    println!(
        "stopped: {reason:?} after {evaluations} evaluations in {:.2?} (sequential: {:.2?})",
        started.elapsed(),
        Duration::from_millis(50) * evaluations as u32,
    );

    let (best, score) = opt.best_pars().expect("run produced observations");
    println!(
        "best: x = {:.3}, y = {:.3}, score = {score:.4}",
        best["x"].as_f64(),
        best["y"].as_f64(),
    );
    Ok(())
}
