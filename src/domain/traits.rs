// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The pipeline talks to its two outside collaborators through
// traits:
//
//   CorpusSource  — where the parsed token stream comes from
//                   (a JSON file today; the MIDI parser itself
//                   could implement it directly)
//
//   SequenceModel — the trainable network. Training and
//                   generation only need fit / predict / weight
//                   snapshots, so the Burn LSTM and the test
//                   stubs are interchangeable.
//
// The model is always passed as an explicit `&mut` handle.
// Its weights change only inside `fit`, `set_weights` and
// `load_weights`, never as a side effect of anything else.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::path::Path;

use crate::data::dataset::WindowedDataset;
use crate::domain::token::Token;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Anything that can hand over the full, ordered token corpus.
pub trait CorpusSource {
    fn load_corpus(&self) -> Result<Vec<Token>>;
}

// ─── SequenceModel ────────────────────────────────────────────────────────────
/// A next-token model over a vocabulary of `num_classes()` ids.
pub trait SequenceModel {
    /// Snapshot of every trainable parameter. Cloning it must give
    /// a copy that later `fit` calls cannot change.
    type Weights: Clone;

    /// Size of the output distribution (the vocabulary size the
    /// model was built for).
    fn num_classes(&self) -> usize;

    /// One full pass over the dataset. Inputs are the scaled (W, 1)
    /// windows, targets are one-hot rows. Returns the mean loss.
    fn fit(&mut self, dataset: &WindowedDataset) -> Result<f64>;

    /// One categorical distribution per input window. Every input
    /// must be a scaled window of the length the model was trained on.
    fn predict(&self, inputs: &[Vec<f32>]) -> Result<Vec<Vec<f32>>>;

    fn get_weights(&self) -> Self::Weights;

    fn set_weights(&mut self, weights: Self::Weights);

    /// Write the current weights to exactly `path`.
    fn save_weights(&self, path: &Path) -> Result<()>;

    /// Replace the current weights with the ones stored at `path`.
    fn load_weights(&mut self, path: &Path) -> Result<()>;
}
