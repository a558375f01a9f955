//! End-to-end optimization behavior on known test functions.

use bayesopt::prelude::*;

/// A smooth 1-D maximization problem with its optimum at x = 7.
fn neg_quadratic(pars: &Pars) -> bayesopt::Result<f64> {
    let x = pars["x"].as_f64();
    Ok(-(x - 7.0).powi(2))
}

#[test]
fn test_quadratic_converges_near_the_optimum() {
    // Maximize -(x - 7)^2 over [0, 10]: 3 design points plus 5 EI
    // iterations should land close to the vertex.
    let domain = Domain::builder().continuous("x", 0.0, 10.0).build().unwrap();
    let mut opt = BayesOpt::builder(domain)
        .init_points(3)
        .iterations(5)
        .acquisition(Acquisition::expected_improvement())
        .seed(42)
        .build()
        .unwrap();

    let reason = opt.run(neg_quadratic).expect("run should succeed");
    assert_eq!(reason, StopReason::IterationsExhausted);

    let (best, score) = opt.best_pars().expect("at least one observation");
    let x = best["x"].as_f64();
    assert!(
        (x - 7.0).abs() < 0.5,
        "best x {x} should be within 0.5 of the optimum 7"
    );
    assert!(score > -1.0, "best score {score} should be above -1");
    assert_eq!(opt.n_observations(), 3 + 5);
}

#[test]
fn test_two_dimensional_sphere() {
    // Maximize -(x^2 + y^2) over [-5, 5]^2, optimum at the origin.
    let domain = Domain::builder()
        .continuous("x", -5.0, 5.0)
        .continuous("y", -5.0, 5.0)
        .build()
        .unwrap();
    let mut opt = BayesOpt::builder(domain)
        .init_points(6)
        .iterations(12)
        .seed(99)
        .build()
        .unwrap();

    opt.run(|pars: &Pars| {
        let x = pars["x"].as_f64();
        let y = pars["y"].as_f64();
        Ok::<_, Error>(-(x * x + y * y))
    })
    .expect("run should succeed");

    let (_, score) = opt.best_pars().unwrap();
    // random search over 18 points averages around -4; the surrogate
    // should do clearly better
    assert!(score > -2.0, "best score {score} should beat random search");
}

#[test]
fn test_integer_dimensions_stay_on_the_grid() {
    let domain = Domain::builder()
        .continuous("rate", 0.0, 1.0)
        .integer("depth", 1, 16)
        .build()
        .unwrap();
    let mut opt = BayesOpt::builder(domain)
        .init_points(4)
        .iterations(6)
        .seed(5)
        .build()
        .unwrap();

    opt.run(|pars: &Pars| {
        let rate = pars["rate"].as_f64();
        let depth = pars["depth"].as_f64();
        Ok::<_, Error>(-(rate - 0.3).powi(2) - (depth - 9.0).powi(2) / 64.0)
    })
    .expect("run should succeed");

    for row in opt.score_summary() {
        let depth = &row.pars["depth"];
        assert!(
            matches!(depth, ParamValue::Int(d) if (1..=16).contains(d)),
            "depth must be a whole in-bounds value, got {depth:?}"
        );
        assert!((0.0..=1.0).contains(&row.pars["rate"].as_f64()));
    }
}

#[test]
fn test_duplicate_flood_completes_every_iteration() {
    // A constant score gives the acquisition nothing to work with, so the
    // search keeps collapsing onto near-duplicates. The run must still
    // complete every iteration via perturbation and random fallbacks.
    let domain = Domain::builder().continuous("x", 0.0, 1.0).build().unwrap();
    let mut opt = BayesOpt::builder(domain)
        .init_points(4)
        .iterations(8)
        .seed(31)
        .build()
        .unwrap();

    let reason = opt
        .run(|_: &Pars| Ok::<_, Error>(1.0))
        .expect("flood of duplicates must not abort the run");
    assert_eq!(reason, StopReason::IterationsExhausted);
    assert_eq!(opt.n_observations(), 4 + 8);
    assert_eq!(opt.phase(), Phase::Done);
}

#[test]
fn test_batch_proposals_are_pairwise_distinct() {
    // With batch_size = 3 on the unit square, every iteration's batch must
    // be three genuinely different points.
    let domain = Domain::builder()
        .continuous("a", 0.0, 1.0)
        .continuous("b", 0.0, 1.0)
        .build()
        .unwrap();
    let mut opt = BayesOpt::builder(domain)
        .init_points(4)
        .iterations(4)
        .batch_size(3)
        .seed(77)
        .build()
        .unwrap();

    opt.run(|pars: &Pars| {
        let a = pars["a"].as_f64();
        let b = pars["b"].as_f64();
        Ok::<_, Error>(-(a - 0.4).powi(2) - (b - 0.6).powi(2))
    })
    .expect("run should succeed");

    for iteration in 1..=4 {
        let batch: Vec<(f64, f64)> = opt
            .score_summary()
            .iter()
            .filter(|o| o.iteration == iteration)
            .map(|o| (o.pars["a"].as_f64(), o.pars["b"].as_f64()))
            .collect();
        assert_eq!(batch.len(), 3, "iteration {iteration} should evaluate 3 points");
        for (i, p) in batch.iter().enumerate() {
            for q in batch.iter().skip(i + 1) {
                let dist = ((p.0 - q.0).powi(2) + (p.1 - q.1).powi(2)).sqrt();
                assert!(
                    dist > 1e-6,
                    "batch points {p:?} and {q:?} are closer than the duplicate tolerance"
                );
            }
        }
    }
}

#[test]
fn test_seed_points_are_evaluated_first() {
    let domain = Domain::builder().continuous("x", 0.0, 10.0).build().unwrap();
    let seed: Pars = [("x".to_string(), ParamValue::Float(7.0))].into();
    let mut opt = BayesOpt::builder(domain)
        .init_points(3)
        .iterations(2)
        .seed_point(seed)
        .seed(11)
        .build()
        .unwrap();

    opt.run(neg_quadratic).expect("run should succeed");

    let first = &opt.score_summary()[0];
    assert_eq!(first.origin, Origin::InitialDesign);
    assert_eq!(first.iteration, 0);
    assert!((first.pars["x"].as_f64() - 7.0).abs() < 1e-12);
    // the seed point sits on the optimum, so it stays the best
    let (best, _) = opt.best_pars().unwrap();
    assert!((best["x"].as_f64() - 7.0).abs() < 1e-12);
}

#[test]
fn test_aux_values_are_preserved_verbatim() {
    let domain = Domain::builder().continuous("x", 0.0, 1.0).build().unwrap();
    let mut opt = BayesOpt::builder(domain)
        .init_points(3)
        .iterations(1)
        .seed(2)
        .build()
        .unwrap();

    opt.run(|pars: &Pars| {
        let x = pars["x"].as_f64();
        Ok::<_, Error>(
            Evaluation::new(-x)
                .with_aux("epochs", 12i64)
                .with_aux("backend", "cpu"),
        )
    })
    .expect("run should succeed");

    for row in opt.score_summary() {
        assert_eq!(row.aux.get("epochs"), Some(&AuxValue::Int(12)));
        assert_eq!(row.aux.get("backend"), Some(&AuxValue::Text("cpu".to_string())));
    }
}

#[test]
fn test_alternative_acquisitions_and_kernel() {
    // UCB with a Matern 5/2 kernel and likelihood-tuned lengthscales is the
    // other well-trodden configuration; it has to make progress too.
    let domain = Domain::builder().continuous("x", 0.0, 10.0).build().unwrap();
    let mut opt = BayesOpt::builder(domain)
        .init_points(4)
        .iterations(6)
        .acquisition(Acquisition::upper_confidence_bound(2.576))
        .kernel(Matern52)
        .tuning(Tuning::MarginalLikelihood)
        .seed(8)
        .build()
        .unwrap();
    opt.run(neg_quadratic).expect("run should succeed");
    assert!(opt.best_pars().unwrap().1 > -4.0);

    let domain = Domain::builder().continuous("x", 0.0, 10.0).build().unwrap();
    let mut opt = BayesOpt::builder(domain)
        .init_points(4)
        .iterations(6)
        .acquisition(Acquisition::probability_of_improvement())
        .seed(8)
        .build()
        .unwrap();
    opt.run(neg_quadratic).expect("run should succeed");
    assert!(opt.best_pars().unwrap().1 > -4.0);
}
