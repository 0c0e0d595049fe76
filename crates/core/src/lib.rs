//! # ssf-core
//!
//! Description of linear Gaussian state-space models and the per-run
//! working storage shared by every filter of the workspace.
//!
//! ```text
//! a[t+1] = T(t) a[t] + u[t],   u[t] ~ N(0, V(t))      (dynamics)
//! y[t]   = Z(t) a[t] + e[t],   e[t] ~ N(0, H(t))      (loading, measurement error)
//! ```
//!
//! ## Building Blocks
//!
//! ```mermaid
//! graph LR
//!     D["Dynamics (T, V)"] --> S["Ssf"]
//!     L["Loading (Z)"] --> S
//!     E["MeasurementError (H)"] -.->|optional| S
//!     I["Initialization"] --> S
//!     S -->|"filters (ssf-filters)"| R["FilteringResults sink"]
//! ```
//!
//! ## Mathematical Glossary
//!
//! | Symbol | Accessor | Meaning |
//! |--------|----------|---------|
//! | a | [`State::a()`] | state mean |
//! | P | [`State::p()`] | state covariance |
//! | B | [`AugmentedState::b()`] | diffuse constraint basis, `P∞ = B Bᵀ` |
//! | e | [`UpdateInformation::e()`] | one-step-ahead prediction error |
//! | f | [`UpdateInformation::f()`] | prediction error variance |
//! | M | [`UpdateInformation::m()`] | gain vector (`P Zᵀ`) |

mod data;
mod dynamics;
mod error;
mod initialization;
mod loading;
mod measurement;
pub mod models;
mod results;
mod ssf;
mod state;
mod update;

pub use data::SsfData;
pub use dynamics::{ConstantDynamics, Dynamics, VaryingDynamics};
pub use error::ModelError;
pub use initialization::{Initialization, solve_lyapunov};
pub use loading::{ConstantLoading, Loading, VaryingLoading};
pub use measurement::{ConstantError, MeasurementError, VaryingError};
pub use results::{CollapseInformation, FilteredRecords, FilteringResults, StatePhase, StepRecord};
pub use ssf::Ssf;
pub use state::{AugmentedState, State};
pub use update::{AugmentedUpdateInformation, UpdateInformation, UpdateStatus};
