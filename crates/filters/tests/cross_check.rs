//! All filters must give the same likelihood on the same model and data.

use approx::assert_relative_eq;
use ndarray::array;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use ssf_core::models::{arma, local_level, local_linear_trend};
use ssf_core::{ConstantDynamics, ConstantError, ConstantLoading, Initialization, Ssf, SsfData};
use ssf_filters::{Filter, FilterSettings, FilterStrategy};
use ssf_likelihood::{DiffuseLikelihood, PredictionErrorDecomposition};

fn all_strategies() -> Vec<FilterStrategy> {
    let s = FilterSettings::new();
    vec![
        FilterStrategy::diffuse(s),
        FilterStrategy::square_root(s),
        FilterStrategy::augmented(s),
        FilterStrategy::chandrasekhar(s),
    ]
}

fn run(mut filter: FilterStrategy, ssf: &Ssf, y: &[f64]) -> DiffuseLikelihood {
    let mut ped = PredictionErrorDecomposition::new();
    filter
        .process(ssf, &SsfData::new(y), &mut ped)
        .unwrap_or_else(|e| panic!("{} failed: {e}", filter.name()));
    ped.into_likelihood().unwrap()
}

fn assert_all_agree(ssf: &Ssf, y: &[f64]) {
    let reference = run(FilterStrategy::diffuse(FilterSettings::new()), ssf, y);
    for filter in all_strategies() {
        let name = filter.name();
        let ll = run(filter, ssf, y);
        assert_eq!(ll.n(), reference.n(), "{name}: n");
        assert_eq!(ll.d(), reference.d(), "{name}: d");
        assert_relative_eq!(ll.log_likelihood(), reference.log_likelihood(), max_relative = 1e-6);
        assert_relative_eq!(ll.ssq_err(), reference.ssq_err(), max_relative = 1e-6);
        assert_relative_eq!(
            ll.log_determinant() + ll.diffuse_correction(),
            reference.log_determinant() + reference.diffuse_correction(),
            epsilon = 1e-6,
            max_relative = 1e-6
        );
    }
}

fn random_walk(n: usize, drift: f64, seed: u64) -> Vec<f64> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut level = 0.0;
    (0..n)
        .map(|_| {
            level += drift + normal.sample(&mut rng);
            level + 0.5 * normal.sample(&mut rng)
        })
        .collect()
}

/// Random-walk level plus a stationary AR(1) component, observed with noise.
fn level_plus_ar1(phi: f64, level_var: f64, ar_var: f64, noise: f64) -> Ssf {
    let stationary = ar_var / (1.0 - phi * phi);
    Ssf::new(
        ConstantDynamics::new(
            array![[1.0, 0.0], [0.0, phi]],
            array![[level_var, 0.0], [0.0, ar_var]],
        )
        .unwrap(),
        ConstantLoading::new(array![1.0, 1.0]).unwrap(),
        Initialization::diffuse(
            array![0.0, 0.0],
            array![[0.0, 0.0], [0.0, stationary]],
            array![[1.0], [0.0]],
        )
        .unwrap(),
    )
    .unwrap()
    .with_measurement_error(ConstantError::new(noise).unwrap())
}

#[test]
fn local_linear_trend_agrees() {
    let ssf = local_linear_trend(0.4, 0.02, 1.0).unwrap();
    let y = random_walk(120, 0.3, 42);
    assert_all_agree(&ssf, &y);
}

#[test]
fn level_plus_ar1_agrees() {
    let ssf = level_plus_ar1(0.6, 0.3, 1.0, 0.5);
    let y = random_walk(150, 0.0, 7);
    assert_all_agree(&ssf, &y);
}

#[test]
fn local_level_with_missing_values_agrees() {
    let ssf = local_level(0.8, 1.0).unwrap();
    let mut y = random_walk(100, 0.0, 99);
    for i in [0, 1, 17, 18, 19, 64] {
        y[i] = f64::NAN;
    }
    assert_all_agree(&ssf, &y);
}

#[test]
fn trend_with_missing_values_in_the_diffuse_phase_agrees() {
    let ssf = local_linear_trend(0.2, 0.05, 1.0).unwrap();
    let mut y = random_walk(60, 0.1, 3);
    y[1] = f64::NAN;
    y[30] = f64::NAN;
    assert_all_agree(&ssf, &y);
}

#[test]
fn noiseless_random_walk_agrees() {
    let ssf = local_level(1.0, 0.0).unwrap();
    let y = random_walk(80, 0.0, 5);
    assert_all_agree(&ssf, &y);
}

#[test]
fn noiseless_trend_agrees() {
    let ssf = local_linear_trend(0.3, 0.3, 0.0).unwrap();
    let y = random_walk(80, 0.2, 11);
    assert_all_agree(&ssf, &y);
}

#[test]
fn stationary_arma_without_noise_agrees() {
    let ssf = arma(&[0.5, -0.3], &[0.4], 1.0).unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(21);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut prev = (0.0, 0.0, 0.0);
    let y: Vec<f64> = (0..150)
        .map(|_| {
            let eps = normal.sample(&mut rng);
            let x = 0.5 * prev.0 - 0.3 * prev.1 + eps + 0.4 * prev.2;
            prev = (x, prev.0, eps);
            x
        })
        .collect();
    assert_all_agree(&ssf, &y);
}
