//! Callback interface through which filters report their per-step output.

use crate::state::State;
use crate::update::{AugmentedUpdateInformation, UpdateInformation, UpdateStatus};

/// Phase of a state emitted through [`FilteringResults::save_state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatePhase {
    /// `a(t|t-1)`, before the observation at `t` is processed.
    Prediction,
    /// `a(t|t)`, after the measurement update at `t`.
    Concurrent,
    /// `a(n|n-1)`, the one-step-ahead state after the last observation.
    Final,
    /// `a(n+h|n-1)`, emitted by forecasting.
    Forecast,
}

/// Statistics released when the augmented filter collapses its diffuse part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollapseInformation {
    /// Position of the observation after which the collapse happened.
    pub position: usize,
    /// Number of diffuse directions resolved.
    pub d: usize,
    /// Sum of squared standardized residuals of the augmented phase, net of
    /// the estimated diffuse effects.
    pub ssq: f64,
    /// Diffuse correction `ln |Σ Eᵀ E / f|`.
    pub dcorr: f64,
}

/// Results sink fed by every filter.
///
/// `save` is called once per non-missing position in time order, before the
/// state is propagated; the referenced scratch is overwritten by the next
/// step. All other methods default to no-ops.
pub trait FilteringResults {
    /// Records the measurement update at `pos`.
    fn save(&mut self, pos: usize, info: &UpdateInformation);

    /// Records a measurement update of the augmented filter.
    fn save_augmented(&mut self, pos: usize, info: &AugmentedUpdateInformation) {
        self.save(pos, info.update());
    }

    /// Called once when the augmented filter folds its diffuse columns into
    /// the ordinary state.
    fn collapse(&mut self, _info: &CollapseInformation) {}

    /// Whether [`Self::save_state`] should be called.
    fn wants_states(&self) -> bool {
        false
    }

    /// Records a state snapshot.
    fn save_state(&mut self, _pos: usize, _state: &State, _phase: StatePhase) {}

    /// Called once after the last position; `end` is the exclusive end
    /// position.
    fn close(&mut self, _end: usize) {}
}

impl FilteringResults for () {
    fn save(&mut self, _pos: usize, _info: &UpdateInformation) {}
}

impl<S: FilteringResults + ?Sized> FilteringResults for &mut S {
    fn save(&mut self, pos: usize, info: &UpdateInformation) {
        (**self).save(pos, info);
    }

    fn save_augmented(&mut self, pos: usize, info: &AugmentedUpdateInformation) {
        (**self).save_augmented(pos, info);
    }

    fn collapse(&mut self, info: &CollapseInformation) {
        (**self).collapse(info);
    }

    fn wants_states(&self) -> bool {
        (**self).wants_states()
    }

    fn save_state(&mut self, pos: usize, state: &State, phase: StatePhase) {
        (**self).save_state(pos, state, phase);
    }

    fn close(&mut self, end: usize) {
        (**self).close(end);
    }
}

impl<A: FilteringResults, B: FilteringResults> FilteringResults for (A, B) {
    fn save(&mut self, pos: usize, info: &UpdateInformation) {
        self.0.save(pos, info);
        self.1.save(pos, info);
    }

    fn save_augmented(&mut self, pos: usize, info: &AugmentedUpdateInformation) {
        self.0.save_augmented(pos, info);
        self.1.save_augmented(pos, info);
    }

    fn collapse(&mut self, info: &CollapseInformation) {
        self.0.collapse(info);
        self.1.collapse(info);
    }

    fn wants_states(&self) -> bool {
        self.0.wants_states() || self.1.wants_states()
    }

    fn save_state(&mut self, pos: usize, state: &State, phase: StatePhase) {
        if self.0.wants_states() {
            self.0.save_state(pos, state, phase);
        }
        if self.1.wants_states() {
            self.1.save_state(pos, state, phase);
        }
    }

    fn close(&mut self, end: usize) {
        self.0.close(end);
        self.1.close(end);
    }
}

/// Copy of one measurement update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepRecord {
    /// Model position.
    pub pos: usize,
    /// Prediction error.
    pub e: f64,
    /// Prediction error variance.
    pub f: f64,
    /// Diffuse prediction error variance.
    pub fi: f64,
    /// How the observation entered the recursion.
    pub status: UpdateStatus,
    /// Diffuse columns still carried by the augmented filter at this step
    /// (`None` for the other filters).
    pub diffuse_dim: Option<usize>,
}

/// Sink that keeps a copy of every step, and optionally of every state.
#[derive(Clone, Debug, Default)]
pub struct FilteredRecords {
    steps: Vec<StepRecord>,
    states: Option<Vec<(usize, StatePhase, State)>>,
    collapse: Option<CollapseInformation>,
    end: Option<usize>,
}

impl FilteredRecords {
    /// Records steps only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records steps and state snapshots.
    pub fn with_states() -> Self {
        Self {
            states: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Recorded steps, in time order.
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Recorded state snapshots (empty unless built with
    /// [`Self::with_states`]).
    pub fn states(&self) -> &[(usize, StatePhase, State)] {
        self.states.as_deref().unwrap_or(&[])
    }

    /// Snapshots of one phase.
    pub fn states_in(&self, phase: StatePhase) -> impl Iterator<Item = (usize, &State)> + '_ {
        self.states()
            .iter()
            .filter(move |(_, p, _)| *p == phase)
            .map(|(pos, _, s)| (*pos, s))
    }

    /// Collapse reported by the augmented filter.
    pub fn collapse_info(&self) -> Option<&CollapseInformation> {
        self.collapse.as_ref()
    }

    /// Position after which the augmented filter collapsed.
    pub fn collapse_position(&self) -> Option<usize> {
        self.collapse.map(|c| c.position)
    }

    /// Exclusive end position reported by `close`.
    pub fn end(&self) -> Option<usize> {
        self.end
    }

    fn push(&mut self, pos: usize, info: &UpdateInformation, diffuse_dim: Option<usize>) {
        self.steps.push(StepRecord {
            pos,
            e: info.e(),
            f: info.f(),
            fi: info.fi(),
            status: info.status(),
            diffuse_dim,
        });
    }
}

impl FilteringResults for FilteredRecords {
    fn save(&mut self, pos: usize, info: &UpdateInformation) {
        self.push(pos, info, None);
    }

    fn save_augmented(&mut self, pos: usize, info: &AugmentedUpdateInformation) {
        self.push(pos, info.update(), Some(info.e_diffuse().len()));
    }

    fn collapse(&mut self, info: &CollapseInformation) {
        self.collapse = Some(*info);
    }

    fn wants_states(&self) -> bool {
        self.states.is_some()
    }

    fn save_state(&mut self, pos: usize, state: &State, phase: StatePhase) {
        if let Some(states) = self.states.as_mut() {
            states.push((pos, phase, state.clone()));
        }
    }

    fn close(&mut self, end: usize) {
        self.end = Some(end);
    }
}
