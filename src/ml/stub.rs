//! Scripted `SequenceModel` for tests: losses come from a list,
//! the "weights" are a counter bumped on every fit, and predictions
//! are a fixed distribution.

use anyhow::{anyhow, bail, Result};
use std::cell::Cell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use crate::data::dataset::WindowedDataset;
use crate::domain::traits::SequenceModel;

pub struct StubModel {
    classes: usize,
    weights: u64,
    losses: VecDeque<f64>,
    fail_fit_on_call: Option<usize>,
    fail_predict_on_call: Option<usize>,
    fail_save: bool,
    distribution: Option<Vec<f32>>,
    pub fit_calls: usize,
    pub predict_calls: Cell<usize>,
}

impl StubModel {
    pub fn new(classes: usize) -> Self {
        Self {
            classes,
            weights: 0,
            losses: VecDeque::new(),
            fail_fit_on_call: None,
            fail_predict_on_call: None,
            fail_save: false,
            distribution: None,
            fit_calls: 0,
            predict_calls: Cell::new(0),
        }
    }

    pub fn with_losses(mut self, losses: &[f64]) -> Self {
        self.losses = losses.iter().copied().collect();
        self
    }

    /// Zero-based fit call that returns an error.
    pub fn failing_fit_on(mut self, call: usize) -> Self {
        self.fail_fit_on_call = Some(call);
        self
    }

    /// Zero-based predict call that returns an error.
    pub fn failing_predict_on(mut self, call: usize) -> Self {
        self.fail_predict_on_call = Some(call);
        self
    }

    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    /// Return `distribution` from every predict instead of a uniform one.
    pub fn with_distribution(mut self, distribution: Vec<f32>) -> Self {
        self.distribution = Some(distribution);
        self
    }
}

impl SequenceModel for StubModel {
    type Weights = u64;

    fn num_classes(&self) -> usize {
        self.classes
    }

    fn fit(&mut self, _dataset: &WindowedDataset) -> Result<f64> {
        let call = self.fit_calls;
        self.fit_calls += 1;
        if self.fail_fit_on_call == Some(call) {
            bail!("scripted fit failure");
        }
        self.weights += 1;
        Ok(self.losses.pop_front().unwrap_or(1.0))
    }

    fn predict(&self, inputs: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        let call = self.predict_calls.get();
        self.predict_calls.set(call + 1);
        if self.fail_predict_on_call == Some(call) {
            bail!("scripted predict failure");
        }
        let row = self
            .distribution
            .clone()
            .unwrap_or_else(|| vec![1.0 / self.classes as f32; self.classes]);
        Ok(inputs.iter().map(|_| row.clone()).collect())
    }

    fn get_weights(&self) -> u64 {
        self.weights
    }

    fn set_weights(&mut self, weights: u64) {
        self.weights = weights;
    }

    fn save_weights(&self, path: &Path) -> Result<()> {
        if self.fail_save {
            bail!("scripted save failure");
        }
        fs::write(path, self.weights.to_string())?;
        Ok(())
    }

    fn load_weights(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)?;
        self.weights = text
            .trim()
            .parse()
            .map_err(|e| anyhow!("bad stub weights: {e}"))?;
        Ok(())
    }
}
