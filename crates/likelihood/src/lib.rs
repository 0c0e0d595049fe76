//! # ssf-likelihood
//!
//! Gaussian likelihoods assembled from prediction error decompositions.
//!
//! ```mermaid
//! graph LR
//!     F["filter (ssf-filters)"] -->|"save / collapse"| P["PredictionErrorDecomposition"]
//!     P -->|".likelihood()?"| D["DiffuseLikelihood"]
//!     D -->|".add(&other)?"| D
//!     D -->|".rescale(c)?"| D
//!     D -->|"from_basis(B)"| M["MarginalLikelihood"]
//! ```
//!
//! ## Mathematical Glossary
//!
//! | Symbol | Accessor | Meaning |
//! |--------|----------|---------|
//! | ll | [`DiffuseLikelihood::log_likelihood()`] | concentrated diffuse log-likelihood |
//! | σ² | [`DiffuseLikelihood::sigma2()`] | concentrated scale `ssq / m` |
//! | m | [`DiffuseLikelihood::degrees_of_freedom()`] | `n − d` (`n` in legacy mode) |
//! | mcorr | [`MarginalLikelihood::marginal_correction()`] | `ln |Bᵀ B|` |

mod decomposition;
mod diffuse;
mod error;
mod marginal;

pub use decomposition::PredictionErrorDecomposition;
pub use diffuse::DiffuseLikelihood;
pub use error::LikelihoodError;
pub use marginal::MarginalLikelihood;
