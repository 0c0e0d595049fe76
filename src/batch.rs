//! Parallel evaluation of independent filter runs.
//!
//! Every run owns its filter and accumulator; models are shared read-only,
//! so the only parallelism is across runs.

use rayon::prelude::*;
use ssf_core::{Ssf, SsfData};
use ssf_filters::FilterError;
use ssf_likelihood::DiffuseLikelihood;

use crate::toolkit::{LikelihoodOptions, compute_likelihood};

/// Likelihood of each `(model, data)` pair, in input order.
#[tracing::instrument(skip_all, fields(n_jobs = jobs.len()))]
pub fn evaluate_batch(
    options: &LikelihoodOptions,
    jobs: &[(Ssf, SsfData<'_>)],
) -> Vec<Result<DiffuseLikelihood, FilterError>> {
    jobs.par_iter()
        .map(|(ssf, data)| compute_likelihood(options, ssf, data))
        .collect()
}

/// Likelihood of the same data under each model, in input order.
///
/// Typical use is a grid over parameter values.
#[tracing::instrument(skip_all, fields(n_models = models.len(), n = data.len()))]
pub fn evaluate_models(
    options: &LikelihoodOptions,
    models: &[Ssf],
    data: &SsfData<'_>,
) -> Vec<Result<DiffuseLikelihood, FilterError>> {
    models
        .par_iter()
        .map(|ssf| compute_likelihood(options, ssf, data))
        .collect()
}

/// Likelihood of each series under the same model, in input order.
#[tracing::instrument(skip_all, fields(n_series = series.len()))]
pub fn evaluate_series(
    options: &LikelihoodOptions,
    ssf: &Ssf,
    series: &[Vec<f64>],
) -> Vec<Result<DiffuseLikelihood, FilterError>> {
    series
        .par_iter()
        .map(|y| compute_likelihood(options, ssf, &SsfData::new(y)))
        .collect()
}
