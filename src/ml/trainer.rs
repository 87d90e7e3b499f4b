// ============================================================
// Layer 5 — Training Controller
// ============================================================
// Runs a fixed number of full passes over the dataset and keeps
// the weights of ONE epoch: the one whose loss lands closest to
// the target loss (0.2), not the one with the lowest loss. On
// this workload a very low loss means the network has memorised
// short excerpts, so the lowest-loss epoch is usually the worst
// one to sample from.
//
//   best_distance = +∞
//   for each epoch:
//       loss     = fit(dataset)
//       distance = |loss − target|
//       if distance < best_distance:      ← strict: first seen wins ties
//           snapshot current weights
//
// After the loop the snapshot is restored into the model and
// committed to disk as one unit with whatever companion files the
// CheckpointManager was given. A failing fit ends the run at once
// and nothing is written. The caller can stop the loop
// between epochs (never inside one) through the observer.
//
// Reference: Rust Book §13 (Closures)

use std::ops::ControlFlow;
use std::path::PathBuf;

use crate::data::dataset::WindowedDataset;
use crate::domain::error::PipelineError;
use crate::domain::traits::SequenceModel;
use crate::infra::checkpoint::{CheckpointManager, CheckpointRecord};

/// Full passes over the dataset per training run.
pub const EPOCHS: usize = 100;

/// Loss the selected epoch should be closest to.
pub const TARGET_LOSS: f64 = 0.2;

/// Independent copy of model weights plus the loss that produced them.
#[derive(Debug, Clone)]
pub struct ModelCheckpoint<W> {
    pub weights: W,
    pub loss: f64,
    pub epoch: usize,
}

/// Handed to the observer after every epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// Zero-based epoch index
    pub epoch: usize,
    pub loss: f64,
    pub distance: f64,
    /// Whether this epoch became the new best checkpoint
    pub selected: bool,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct CheckpointResult {
    pub record: CheckpointRecord,
    pub weights_path: PathBuf,
    /// Loss of every epoch that ran, in order
    pub losses: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct TrainingController {
    pub epochs: usize,
    pub target_loss: f64,
}

impl TrainingController {
    pub fn new(epochs: usize, target_loss: f64) -> Self {
        Self {
            epochs,
            target_loss,
        }
    }

    /// Train, select, restore and commit.
    ///
    /// `on_epoch` runs after each epoch; returning `Break` ends
    /// training there and the best epoch so far is still committed.
    pub fn run<M, F>(
        &self,
        model: &mut M,
        dataset: &WindowedDataset,
        checkpoints: &CheckpointManager,
        mut on_epoch: F,
    ) -> Result<CheckpointResult, PipelineError>
    where
        M: SequenceModel,
        F: FnMut(&EpochReport) -> ControlFlow<()>,
    {
        tracing::info!(
            "Training for {} epochs on {} windows (target loss {})",
            self.epochs,
            dataset.len(),
            self.target_loss
        );

        let mut best_distance = f64::INFINITY;
        let mut best: Option<ModelCheckpoint<M::Weights>> = None;
        let mut losses = Vec::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            let loss = model.fit(dataset).map_err(|e| PipelineError::Fit {
                epoch,
                source: e.into(),
            })?;

            // NaN never compares less, so a diverged epoch is never kept.
            let distance = (loss - self.target_loss).abs();
            let selected = distance < best_distance;
            if selected {
                best_distance = distance;
                best = Some(ModelCheckpoint {
                    weights: model.get_weights(),
                    loss,
                    epoch,
                });
            }
            losses.push(loss);

            tracing::info!(
                "Epoch {:>3}/{} | loss={:.4} | distance={:.4}{}",
                epoch + 1,
                self.epochs,
                loss,
                distance,
                if selected { " | new best" } else { "" }
            );

            let report = EpochReport {
                epoch,
                loss,
                distance,
                selected,
            };
            if on_epoch(&report).is_break() {
                tracing::info!("Training stopped after epoch {}", epoch + 1);
                break;
            }
        }

        let Some(best) = best else {
            return Err(PipelineError::NoCheckpoint {
                epochs: losses.len(),
            });
        };

        model.set_weights(best.weights);

        let record = CheckpointRecord {
            epoch: best.epoch,
            loss: best.loss,
            distance: best_distance,
            target_loss: self.target_loss,
            epochs_run: losses.len(),
            vocab_size: dataset.vocab_size(),
            window_length: dataset.window_length(),
            vocab_fingerprint: dataset.vocab_fingerprint().to_string(),
        };
        let weights_path = checkpoints.commit(model, &record)?;

        Ok(CheckpointResult {
            record,
            weights_path,
            losses,
        })
    }
}

/// Run `epochs` epochs with no observer and commit the epoch whose
/// loss is closest to `target_loss`.
#[allow(dead_code)] // the CLI drives TrainingController::run for its metrics observer
pub fn train<M: SequenceModel>(
    model: &mut M,
    dataset: &WindowedDataset,
    epochs: usize,
    target_loss: f64,
    checkpoints: &CheckpointManager,
) -> Result<CheckpointResult, PipelineError> {
    TrainingController::new(epochs, target_loss).run(model, dataset, checkpoints, |_| {
        ControlFlow::Continue(())
    })
}
