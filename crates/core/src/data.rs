//! Univariate observation sequences with `NaN` as the missing-value marker.

/// Borrowed view of the observations processed by a filter run.
///
/// `start` is the model position of the first observation, so that a series
/// split into blocks can be filtered block by block against a time-varying
/// model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SsfData<'a> {
    values: &'a [f64],
    start: usize,
}

impl<'a> SsfData<'a> {
    /// Observations starting at model position 0.
    pub fn new(values: &'a [f64]) -> Self {
        Self { values, start: 0 }
    }

    /// Observations starting at model position `start`.
    pub fn starting_at(values: &'a [f64], start: usize) -> Self {
        Self { values, start }
    }

    /// Number of observations, missing ones included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Model position of the first observation.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Model position of the `i`-th observation.
    pub fn position(&self, i: usize) -> usize {
        self.start + i
    }

    /// Exclusive end position in model time.
    pub fn end(&self) -> usize {
        self.start + self.values.len()
    }

    /// The `i`-th observation, or `None` when it is missing.
    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied().filter(|y| !y.is_nan())
    }

    /// Whether the `i`-th observation is missing.
    pub fn is_missing(&self, i: usize) -> bool {
        self.get(i).is_none()
    }

    /// The raw values.
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Index of the last missing observation.
    pub fn last_missing(&self) -> Option<usize> {
        self.values.iter().rposition(|y| y.is_nan())
    }

    /// Number of non-missing observations.
    pub fn n_observed(&self) -> usize {
        self.values.iter().filter(|y| !y.is_nan()).count()
    }
}

impl<'a> From<&'a [f64]> for SsfData<'a> {
    fn from(values: &'a [f64]) -> Self {
        Self::new(values)
    }
}

impl<'a> From<&'a Vec<f64>> for SsfData<'a> {
    fn from(values: &'a Vec<f64>) -> Self {
        Self::new(values)
    }
}
