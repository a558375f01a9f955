use bayesopt::prelude::*;
use bayesopt::proposal;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn make_domain(dims: usize) -> Domain {
    let mut builder = Domain::builder();
    for i in 0..dims {
        builder = builder.continuous(format!("x{i}"), -5.0, 5.0);
    }
    builder.build().unwrap()
}

/// Latin-hypercube training set in unit coordinates, scored with a sphere
/// centered on the middle of the cube.
fn training_data(domain: &Domain, n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut rng = fastrand::Rng::with_seed(42);
    let x: Vec<Vec<f64>> = domain
        .sample_latin_hypercube(&mut rng, n)
        .iter()
        .map(|pars| domain.normalize(pars).unwrap())
        .collect();
    let y: Vec<f64> = x
        .iter()
        .map(|row| -row.iter().map(|u| (u - 0.5).powi(2)).sum::<f64>())
        .collect();
    (x, y)
}

fn bench_gp_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("gp_fit");
    group.sample_size(10);

    let domain = make_domain(4);
    for n in [25, 50, 100] {
        let (x, y) = training_data(&domain, n);
        group.bench_with_input(BenchmarkId::new("observations", n), &(x, y), |b, (x, y)| {
            b.iter(|| GaussianProcess::fit(x, y, &SurrogateConfig::default()).unwrap());
        });
    }
    group.finish();
}

fn bench_gp_fit_tuned(c: &mut Criterion) {
    let mut group = c.benchmark_group("gp_fit_tuned");
    group.sample_size(10);

    let config = SurrogateConfig {
        tuning: Tuning::MarginalLikelihood,
        ..SurrogateConfig::default()
    };
    for dims in [2, 6] {
        let domain = make_domain(dims);
        let (x, y) = training_data(&domain, 40);
        group.bench_with_input(BenchmarkId::new("dims", dims), &(x, y), |b, (x, y)| {
            b.iter(|| GaussianProcess::fit(x, y, &config).unwrap());
        });
    }
    group.finish();
}

fn bench_gp_predict(c: &mut Criterion) {
    let domain = make_domain(4);
    let (x, y) = training_data(&domain, 100);
    let gp = GaussianProcess::fit(&x, &y, &SurrogateConfig::default()).unwrap();

    let mut rng = fastrand::Rng::with_seed(7);
    let queries: Vec<Vec<f64>> = (0..256)
        .map(|_| (0..4).map(|_| rng.f64()).collect())
        .collect();

    c.bench_function("gp_predict_256", |b| {
        b.iter(|| {
            queries
                .iter()
                .map(|q| {
                    let (mean, variance) = gp.predict(q);
                    mean + variance
                })
                .sum::<f64>()
        });
    });
}

fn bench_propose(c: &mut Criterion) {
    let mut group = c.benchmark_group("propose");
    group.sample_size(10);

    let domain = make_domain(4);
    let (x, y) = training_data(&domain, 50);
    let gp = GaussianProcess::fit(&x, &y, &SurrogateConfig::default()).unwrap();
    let incumbent = y
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| x[i].clone())
        .unwrap();

    for batch in [1, 4] {
        group.bench_with_input(BenchmarkId::new("batch", batch), &batch, |b, &batch| {
            b.iter(|| {
                let mut rng = fastrand::Rng::with_seed(42);
                proposal::propose(
                    &gp,
                    Acquisition::expected_improvement(),
                    &domain,
                    batch,
                    Some(&incumbent),
                    &SearchConfig::default(),
                    &mut rng,
                )
                .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run");
    group.sample_size(10);

    for dims in [2, 6] {
        group.bench_with_input(BenchmarkId::new("dims", dims), &dims, |b, &dims| {
            b.iter(|| {
                let mut opt = BayesOpt::builder(make_domain(dims))
                    .init_points(5)
                    .iterations(10)
                    .seed(42)
                    .build()
                    .unwrap();
                opt.run(|pars: &Pars| {
                    let sum: f64 = (0..dims)
                        .map(|i| pars[format!("x{i}").as_str()].as_f64().powi(2))
                        .sum();
                    Ok::<_, Error>(-sum)
                })
                .unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_gp_fit,
    bench_gp_fit_tuned,
    bench_gp_predict,
    bench_propose,
    bench_full_run
);
criterion_main!(benches);
