//! End-to-end run on a short local-level series with a missing value.

use ssf_core::SsfData;
use ssf_core::models::local_level;
use ssf_filters::{DiffuseFilter, Filter, FilterSettings, FilterStrategy};
use ssf_likelihood::PredictionErrorDecomposition;

const Y: [f64; 5] = [1.0, 2.0, 1.5, f64::NAN, 1.8];

fn log_likelihood(strategy: FilterStrategy) -> (f64, usize, usize) {
    let ssf = local_level(0.0, 1.0).unwrap();
    let mut filter = strategy;
    let mut ped = PredictionErrorDecomposition::new();
    filter.process(&ssf, &SsfData::new(&Y), &mut ped).unwrap();
    let ll = ped.into_likelihood().unwrap();
    (ll.log_likelihood(), ll.n(), ll.d())
}

#[test]
fn local_level_scenario() {
    let (ll, n, d) = log_likelihood(FilterStrategy::diffuse(FilterSettings::new()));
    assert_eq!(n, 4);
    assert_eq!(d, 1);
    assert!(ll.is_finite());
}

#[test]
fn level_is_resolved_by_the_first_observation() {
    let ssf = local_level(0.0, 1.0).unwrap();
    let mut filter = DiffuseFilter::new(FilterSettings::new());
    filter.process(&ssf, &SsfData::new(&Y), &mut ()).unwrap();
    assert_eq!(filter.resolved_position(), Some(0));
}

#[test]
fn repeated_runs_are_bit_identical() {
    let s = FilterSettings::new();
    for make in [
        FilterStrategy::diffuse as fn(FilterSettings) -> FilterStrategy,
        FilterStrategy::square_root,
        FilterStrategy::augmented,
        FilterStrategy::chandrasekhar,
    ] {
        let (first, _, _) = log_likelihood(make(s));
        let (second, _, _) = log_likelihood(make(s));
        assert_eq!(first.to_bits(), second.to_bits());
    }
}

#[test]
fn constant_level_is_the_sample_mean() {
    // with no level noise the filtered level after the data is the mean of
    // the observed values
    let ssf = local_level(0.0, 1.0).unwrap();
    let mut filter = FilterStrategy::diffuse(FilterSettings::new());
    filter.process(&ssf, &SsfData::new(&Y), &mut ()).unwrap();
    let state = filter.final_state().unwrap();
    let mean = (1.0 + 2.0 + 1.5 + 1.8) / 4.0;
    approx::assert_abs_diff_eq!(state.a()[0], mean, epsilon = 1e-12);
    approx::assert_abs_diff_eq!(state.p()[[0, 0]], 0.25, epsilon = 1e-12);
}
