//! # ssf-filters
//!
//! Kalman-type filters for univariate state-space models with exact diffuse
//! initialisation.
//!
//! ## Algorithms
//!
//! ```mermaid
//! graph LR
//!     S["Ssf + SsfData"] --> F{"FilterStrategy"}
//!     F -->|"covariance form"| D["DiffuseFilter"]
//!     F -->|"array form"| Q["SqrtDiffuseFilter"]
//!     F -->|"collapsing"| A["AugmentedFilter"]
//!     F -->|"time-invariant"| C["CkmsFilter"]
//!     D --> R["FilteringResults sink"]
//!     Q --> R
//!     A --> R
//!     C --> R
//! ```
//!
//! Every filter implements [`Filter`]: `initialize`, one `step` per
//! position, `finalize`. [`Filter::process`] runs the whole sequence.
//!
//! | Filter | Diffuse handling | Covariance | Notes |
//! |--------|------------------|------------|-------|
//! | [`DiffuseFilter`] | `P∞` propagated until it vanishes | `P` | reference algorithm |
//! | [`SqrtDiffuseFilter`] | basis `B` shrunk by rotations | factor `L` | positive semidefinite by construction |
//! | [`AugmentedFilter`] | `δ` estimated by GLS, then collapsed | `P` | reports [`ssf_core::CollapseInformation`] |
//! | [`CkmsFilter`] | warm-up with [`DiffuseFilter`] | increment `L W Lᵀ` | freezes at the steady state |
//!
//! All four give the same likelihood for the same model and data.
//!
//! ## Mathematical Glossary
//!
//! | Symbol | Setting | Meaning |
//! |--------|---------|---------|
//! | ε₀ | [`FilterSettings::zero_tolerance()`] | variances at or below are singular |
//! | εᵢ | [`FilterSettings::diffuse_tolerance()`] | `Z P∞ Zᵀ` above triggers a diffuse step |
//! | ε_c | [`FilterSettings::collapse_tolerance()`] | relative rank test before collapsing |
//! | ε_s | [`FilterSettings::steady_state_epsilon()`] | `max |Z L| < ε_s f₀` freezes the fast filter |

mod augmented;
mod ckms;
mod diffuse;
mod error;
mod forecast;
mod recursion;
mod settings;
mod sqrt;
mod strategy;

pub use augmented::AugmentedFilter;
pub use ckms::CkmsFilter;
pub use diffuse::DiffuseFilter;
pub use error::{FailureKind, FilterError};
pub use forecast::{Forecasts, forecast};
pub use settings::{FilterSettings, SingularityPolicy};
pub use sqrt::SqrtDiffuseFilter;
pub use strategy::{Filter, FilterStrategy};
