//! TOML configuration of likelihood evaluation.
//!
//! ```toml
//! [likelihood]
//! collapse_diffuse = true
//! singularity_policy = "fail"
//!
//! [tolerances]
//! zero = 1e-10
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use ssf_filters::{FilterError, FilterSettings, SingularityPolicy};

use crate::toolkit::LikelihoodOptions;

/// Error type for loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Returned when the configuration file cannot be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Returned when the TOML is malformed or has unknown keys.
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Returned for a singularity policy other than `exclude` or `fail`.
    #[error("unknown singularity policy '{0}' (expected 'exclude' or 'fail')")]
    UnknownPolicy(String),

    /// Returned when the resulting settings are out of range.
    #[error(transparent)]
    Invalid(#[from] FilterError),
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SsfConfig {
    /// Filter selection and likelihood options.
    #[serde(default)]
    pub likelihood: LikelihoodToml,

    /// Numerical tolerances.
    #[serde(default)]
    pub tolerances: ToleranceToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LikelihoodToml {
    #[serde(default)]
    pub square_root_form: bool,
    #[serde(default)]
    pub collapse_diffuse: bool,
    #[serde(default)]
    pub robust_standard_errors: bool,
    #[serde(default)]
    pub fast: bool,
    #[serde(default)]
    pub legacy: bool,
    #[serde(default = "default_singularity_policy")]
    pub singularity_policy: String,
}

impl Default for LikelihoodToml {
    fn default() -> Self {
        Self {
            square_root_form: false,
            collapse_diffuse: false,
            robust_standard_errors: false,
            fast: false,
            legacy: false,
            singularity_policy: default_singularity_policy(),
        }
    }
}

fn default_singularity_policy() -> String {
    "exclude".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceToml {
    #[serde(default = "default_zero")]
    pub zero: f64,
    #[serde(default = "default_diffuse")]
    pub diffuse: f64,
    #[serde(default = "default_collapse")]
    pub collapse: f64,
    #[serde(default = "default_steady_state")]
    pub steady_state: f64,
}

impl Default for ToleranceToml {
    fn default() -> Self {
        Self {
            zero: default_zero(),
            diffuse: default_diffuse(),
            collapse: default_collapse(),
            steady_state: default_steady_state(),
        }
    }
}

fn default_zero() -> f64 {
    1e-12
}
fn default_diffuse() -> f64 {
    1e-9
}
fn default_collapse() -> f64 {
    1e-9
}
fn default_steady_state() -> f64 {
    1e-10
}

impl SsfConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`ConfigError::Io`] | the file cannot be read |
    /// | [`ConfigError::Parse`] | malformed TOML or unknown keys |
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Filter settings described by the configuration.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`ConfigError::UnknownPolicy`] | `singularity_policy` is not `exclude` or `fail` |
    /// | [`ConfigError::Invalid`] | a tolerance is out of range |
    pub fn filter_settings(&self) -> Result<FilterSettings, ConfigError> {
        let policy = match self.likelihood.singularity_policy.as_str() {
            "exclude" => SingularityPolicy::Exclude,
            "fail" => SingularityPolicy::Fail,
            other => return Err(ConfigError::UnknownPolicy(other.to_string())),
        };
        let t = &self.tolerances;
        let settings = FilterSettings::new()
            .with_zero_tolerance(t.zero)
            .with_diffuse_tolerance(t.diffuse)
            .with_collapse_tolerance(t.collapse)
            .with_steady_state_epsilon(t.steady_state)
            .with_singularity_policy(policy);
        settings.validate()?;
        Ok(settings)
    }

    /// Likelihood options described by the configuration.
    ///
    /// # Errors
    ///
    /// See [`Self::filter_settings`].
    pub fn likelihood_options(&self) -> Result<LikelihoodOptions, ConfigError> {
        let l = &self.likelihood;
        Ok(LikelihoodOptions::new()
            .with_square_root_form(l.square_root_form)
            .with_collapse_diffuse(l.collapse_diffuse)
            .with_robust_standard_errors(l.robust_standard_errors)
            .with_fast(l.fast)
            .with_legacy(l.legacy)
            .with_settings(self.filter_settings()?))
    }
}
