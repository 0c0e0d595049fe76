//! # ssf
//!
//! State-space filtering toolkit: exact diffuse, square-root, augmented and
//! Chandrasekhar Kalman filters for univariate linear Gaussian models, with
//! the concentrated diffuse likelihood as output.
//!
//! ## Workspace
//!
//! ```mermaid
//! graph TD
//!     LA["ssf-linalg (Givens, Cholesky, LDLᵀ, solves)"] --> C["ssf-core (Ssf, State, sinks)"]
//!     C --> L["ssf-likelihood (DiffuseLikelihood, PredictionErrorDecomposition)"]
//!     C --> F["ssf-filters (DiffuseFilter, SqrtDiffuseFilter, AugmentedFilter, CkmsFilter)"]
//!     L --> F
//!     F --> T["ssf (LikelihoodOptions, likelihood_computer, batch, config)"]
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use ssf::{LikelihoodOptions, likelihood_computer};
//! use ssf::ssf_core::{SsfData, models::local_linear_trend};
//!
//! let model = local_linear_trend(0.3, 0.05, 1.0).unwrap();
//! let y = [1.0, 2.2, 2.9, f64::NAN, 5.1, 5.8, 7.4];
//!
//! let compute = likelihood_computer(LikelihoodOptions::new().with_collapse_diffuse(true));
//! let ll = compute(&model, &SsfData::new(&y)).unwrap();
//! assert_eq!(ll.n(), 6);
//! assert_eq!(ll.d(), 2);
//! assert!(ll.log_likelihood().is_finite());
//! ```
//!
//! ## Mathematical Glossary
//!
//! | Symbol | Accessor | Meaning |
//! |--------|----------|---------|
//! | ll | [`DiffuseLikelihood::log_likelihood()`] | concentrated diffuse log-likelihood |
//! | n | [`DiffuseLikelihood::n()`] | non-missing, non-excluded observations |
//! | d | [`DiffuseLikelihood::d()`] | diffuse elements |
//! | σ² | [`DiffuseLikelihood::sigma2()`] | concentrated scale |

pub mod batch;
pub mod config;
mod toolkit;

pub use config::{ConfigError, SsfConfig};
pub use toolkit::{LikelihoodOptions, compute_likelihood, likelihood_computer, marginal_likelihood_computer};

pub use ssf_core;
pub use ssf_filters;
pub use ssf_likelihood;

pub use ssf_filters::{FailureKind, FilterError};
pub use ssf_likelihood::{DiffuseLikelihood, MarginalLikelihood};
