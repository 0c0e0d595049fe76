//! Structural properties of the filters: collapsing, steady state, missing
//! data, additivity and scaling.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::array;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use ssf_core::models::{arma, local_level, local_linear_trend};
use ssf_core::{
    ConstantDynamics, ConstantLoading, FilteredRecords, FilteringResults, Initialization, Ssf, SsfData,
    UpdateInformation, UpdateStatus,
};
use ssf_filters::{AugmentedFilter, CkmsFilter, DiffuseFilter, Filter, FilterSettings};
use ssf_likelihood::{DiffuseLikelihood, MarginalLikelihood, PredictionErrorDecomposition};

fn noisy_series(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut x = 0.0;
    (0..n)
        .map(|_| {
            x = 0.8 * x + normal.sample(&mut rng);
            x + 0.3 * normal.sample(&mut rng)
        })
        .collect()
}

/// Keeps `M = P Zᵀ` of every step.
#[derive(Default)]
struct GainRecords {
    m: Vec<Vec<f64>>,
}

impl FilteringResults for GainRecords {
    fn save(&mut self, _pos: usize, info: &UpdateInformation) {
        self.m.push(info.m().to_vec());
    }
}

fn diffuse_likelihood(ssf: &Ssf, data: &SsfData<'_>) -> (DiffuseLikelihood, DiffuseFilter) {
    let mut filter = DiffuseFilter::new(FilterSettings::new());
    let mut ped = PredictionErrorDecomposition::new();
    filter.process(ssf, data, &mut ped).unwrap();
    (ped.into_likelihood().unwrap(), filter)
}

#[test]
fn augmented_diffuse_dimension_never_grows() {
    let ssf = local_linear_trend(0.3, 0.01, 1.0).unwrap();
    let mut y = noisy_series(40, 1);
    y[0] = f64::NAN;
    y[2] = f64::NAN;

    let mut filter = AugmentedFilter::new(FilterSettings::new());
    let mut records = FilteredRecords::new();
    filter.process(&ssf, &SsfData::new(&y), &mut records).unwrap();

    let collapse = filter.collapsing_position().unwrap();
    assert_eq!(records.collapse_position(), Some(collapse));
    assert_eq!(collapse, 3);

    let dims: Vec<usize> = records.steps().iter().map(|s| s.diffuse_dim.unwrap()).collect();
    assert!(dims.windows(2).all(|w| w[1] <= w[0]));
    for step in records.steps() {
        if step.pos > collapse {
            assert_eq!(step.diffuse_dim, Some(0));
            assert_eq!(step.status, UpdateStatus::Ordinary);
        }
    }
}

#[test]
fn chandrasekhar_steady_state_is_frozen() {
    let ssf = arma(&[0.7, -0.2], &[0.5], 1.0)
        .unwrap()
        .with_measurement_error(ssf_core::ConstantError::new(0.4).unwrap());
    let y = noisy_series(300, 2);

    let mut filter = CkmsFilter::new(FilterSettings::new());
    let mut sink = (FilteredRecords::new(), GainRecords::default());
    filter.process(&ssf, &SsfData::new(&y), &mut sink).unwrap();
    let (records, gains) = sink;

    let p = filter.steady_state_position().unwrap();
    assert!(p < 300);
    let f_at_p = records.steps()[p].f;
    for step in &records.steps()[p..] {
        assert_eq!(step.f, f_at_p);
    }
    assert_eq!(gains.m.len(), 300);
    for m in &gains.m[p..] {
        assert_eq!(m, &gains.m[p]);
    }

    // the covariance filter converges to the same variance
    let mut full = FilteredRecords::new();
    DiffuseFilter::new(FilterSettings::new())
        .process(&ssf, &SsfData::new(&y), &mut full)
        .unwrap();
    assert_relative_eq!(full.steps()[299].f, f_at_p, max_relative = 1e-8);
}

#[test]
fn missing_value_only_removes_its_own_contribution() {
    let ssf = local_level(0.5, 1.0).unwrap();
    let y = noisy_series(30, 3);
    let mut holed = y.clone();
    holed[12] = f64::NAN;

    let mut full = FilteredRecords::new();
    DiffuseFilter::new(FilterSettings::new())
        .process(&ssf, &SsfData::new(&y), &mut full)
        .unwrap();
    let mut partial = FilteredRecords::new();
    DiffuseFilter::new(FilterSettings::new())
        .process(&ssf, &SsfData::new(&holed), &mut partial)
        .unwrap();

    assert_eq!(partial.steps().len(), full.steps().len() - 1);
    assert!(partial.steps().iter().all(|s| s.pos != 12));
    for (a, b) in full.steps().iter().zip(partial.steps()).take(12) {
        assert_eq!(a, b);
    }

    let (ll_full, _) = diffuse_likelihood(&ssf, &SsfData::new(&y));
    let (ll_partial, _) = diffuse_likelihood(&ssf, &SsfData::new(&holed));
    assert_eq!(ll_partial.n(), ll_full.n() - 1);
    assert_eq!(ll_partial.d(), ll_full.d());
}

#[test]
fn likelihoods_of_contiguous_blocks_add_up() {
    let y = noisy_series(80, 4);
    let split = 35;
    for ssf in [arma(&[0.8], &[0.2], 1.0).unwrap(), local_level(0.6, 1.0).unwrap()] {
        let (whole, _) = diffuse_likelihood(&ssf, &SsfData::new(&y));
        let (first, filter) = diffuse_likelihood(&ssf, &SsfData::new(&y[..split]));

        let (a, p) = filter.final_state().unwrap().into_parts();
        let rest = ssf.clone().with_initialization(Initialization::stationary(a, p).unwrap()).unwrap();
        let (second, _) = diffuse_likelihood(&rest, &SsfData::starting_at(&y[split..], split));

        let merged = first.add(&second).unwrap();
        assert_eq!(merged.n(), whole.n());
        assert_eq!(merged.d(), whole.d());
        assert_relative_eq!(merged.ssq_err(), whole.ssq_err(), max_relative = 1e-10);
        assert_relative_eq!(merged.log_likelihood(), whole.log_likelihood(), max_relative = 1e-10);
    }
}

#[test]
fn scaling_the_data_rescales_the_likelihood() {
    let ssf = local_linear_trend(0.3, 0.05, 1.0).unwrap();
    let y = noisy_series(50, 5);
    let c = 3.5;
    let scaled: Vec<f64> = y.iter().map(|v| v / c).collect();

    let (ll, _) = diffuse_likelihood(&ssf, &SsfData::new(&y));
    let (ll_scaled, _) = diffuse_likelihood(&ssf, &SsfData::new(&scaled));
    let rescaled = ll.rescale(c).unwrap();
    assert_relative_eq!(rescaled.ssq_err(), ll_scaled.ssq_err(), max_relative = 1e-10);
    assert_relative_eq!(rescaled.log_likelihood(), ll_scaled.log_likelihood(), max_relative = 1e-10);
}

#[test]
fn marginal_likelihood_ignores_basis_scale() {
    let y = noisy_series(40, 6);
    let build = |k: f64| {
        let basis = array![[k], [0.0]];
        Ssf::new(
            ConstantDynamics::new(array![[1.0, 0.0], [0.0, 0.5]], array![[0.2, 0.0], [0.0, 1.0]]).unwrap(),
            ConstantLoading::new(array![1.0, 1.0]).unwrap(),
            Initialization::diffuse(array![0.0, 0.0], array![[0.0, 0.0], [0.0, 4.0 / 3.0]], basis).unwrap(),
        )
        .unwrap()
    };

    let marginal = |k: f64| {
        let ssf = build(k);
        let (ll, _) = diffuse_likelihood(&ssf, &SsfData::new(&y));
        let basis = ssf.initialization().basis().unwrap().clone();
        (ll.clone(), MarginalLikelihood::from_basis(ll, basis.view()).unwrap())
    };

    let (d1, m1) = marginal(1.0);
    let (d5, m5) = marginal(5.0);
    assert!((d1.log_likelihood() - d5.log_likelihood()).abs() > 1e-3);
    assert_abs_diff_eq!(m1.log_likelihood(), m5.log_likelihood(), epsilon = 1e-9);
}
