//! Per-step scratch produced by the measurement update.

use ndarray::Array1;

/// How an observation entered the recursion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateStatus {
    /// Ordinary step: contributes `e²/f` and `ln f` to the likelihood.
    Ordinary,
    /// Diffuse (F1) step of the exact diffuse filter: contributes `ln fi` to
    /// the diffuse correction only.
    Diffuse,
    /// Step processed while the augmented filter still carries diffuse
    /// columns: contributes `ln f`; the residual enters the collapse.
    Augmented,
    /// Numerically singular variance; the observation is ignored.
    Excluded,
}

/// Prediction error `e`, its variance `f` and the gain `M = P Zᵀ`.
///
/// Allocated once per run and overwritten at every observed position. Sinks
/// must copy out whatever they keep.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateInformation {
    e: f64,
    f: f64,
    fi: f64,
    m: Array1<f64>,
    status: UpdateStatus,
}

impl UpdateInformation {
    /// Scratch for a state of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            e: 0.0,
            f: 0.0,
            fi: 0.0,
            m: Array1::zeros(dim),
            status: UpdateStatus::Ordinary,
        }
    }

    /// Overwrites the scalar parts. The gain is filled through [`Self::m_mut`].
    pub fn set(&mut self, e: f64, f: f64, fi: f64, status: UpdateStatus) {
        self.e = e;
        self.f = f;
        self.fi = fi;
        self.status = status;
    }

    /// Prediction error.
    pub fn e(&self) -> f64 {
        self.e
    }

    /// Prediction error variance (the finite part at diffuse steps).
    pub fn f(&self) -> f64 {
        self.f
    }

    /// Diffuse prediction error variance `Z P∞ Zᵀ` (0 outside the diffuse
    /// phase).
    pub fn fi(&self) -> f64 {
        self.fi
    }

    /// Gain vector.
    pub fn m(&self) -> &Array1<f64> {
        &self.m
    }

    /// Gain vector, mutably.
    pub fn m_mut(&mut self) -> &mut Array1<f64> {
        &mut self.m
    }

    /// Step status.
    pub fn status(&self) -> UpdateStatus {
        self.status
    }

    /// `e / √f`, or `None` when the step did not produce a standardized
    /// residual (diffuse or excluded steps).
    pub fn standardized_residual(&self) -> Option<f64> {
        match self.status {
            UpdateStatus::Ordinary | UpdateStatus::Augmented if self.f > 0.0 => {
                Some(self.e / self.f.sqrt())
            }
            _ => None,
        }
    }
}

/// [`UpdateInformation`] plus the diffuse prediction errors `E = −Z B`.
#[derive(Clone, Debug, PartialEq)]
pub struct AugmentedUpdateInformation {
    update: UpdateInformation,
    e_diffuse: Array1<f64>,
}

impl AugmentedUpdateInformation {
    /// Scratch for a state of dimension `dim` with `d` diffuse directions.
    pub fn new(dim: usize, d: usize) -> Self {
        Self {
            update: UpdateInformation::new(dim),
            e_diffuse: Array1::zeros(d),
        }
    }

    /// The ordinary part.
    pub fn update(&self) -> &UpdateInformation {
        &self.update
    }

    /// The ordinary part, mutably.
    pub fn update_mut(&mut self) -> &mut UpdateInformation {
        &mut self.update
    }

    /// Diffuse prediction errors (length `d`).
    pub fn e_diffuse(&self) -> &Array1<f64> {
        &self.e_diffuse
    }

    /// Diffuse prediction errors, mutably. Resized when `d` shrinks.
    pub fn e_diffuse_mut(&mut self) -> &mut Array1<f64> {
        &mut self.e_diffuse
    }

    /// Both parts, mutably.
    pub fn parts_mut(&mut self) -> (&mut UpdateInformation, &mut Array1<f64>) {
        (&mut self.update, &mut self.e_diffuse)
    }

    /// Shrinks the diffuse part to `d` entries.
    pub fn truncate_diffuse(&mut self, d: usize) {
        if d < self.e_diffuse.len() {
            self.e_diffuse = Array1::zeros(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn standardized_residual_of_ordinary_step() {
        let mut info = UpdateInformation::new(2);
        info.set(2.0, 4.0, 0.0, UpdateStatus::Ordinary);
        assert_abs_diff_eq!(info.standardized_residual().unwrap(), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn no_residual_for_diffuse_or_excluded_steps() {
        let mut info = UpdateInformation::new(1);
        info.set(2.0, 4.0, 1.0, UpdateStatus::Diffuse);
        assert!(info.standardized_residual().is_none());
        info.set(2.0, 0.0, 0.0, UpdateStatus::Excluded);
        assert!(info.standardized_residual().is_none());
    }

    #[test]
    fn augmented_scratch_shrinks() {
        let mut info = AugmentedUpdateInformation::new(3, 2);
        assert_eq!(info.e_diffuse().len(), 2);
        info.truncate_diffuse(0);
        assert!(info.e_diffuse().is_empty());
        assert_eq!(info.update().m().len(), 3);
    }
}
