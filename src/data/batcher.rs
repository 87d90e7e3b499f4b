// ============================================================
// Layer 4 — Window Batcher
// ============================================================
// Turns windows into the tensors the LSTM consumes.
//
//   inputs:  [batch, W, 1]  ids divided by V  (one feature per step)
//   targets: [batch, V]     one-hot rows
//
// We flatten every row into one Vec<f32> and reshape, exactly
// like stacking pre-padded token rows: all windows have the same
// length, so no padding is ever needed.
//
// Reference: Burn Book §4 (Batcher)

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::domain::window::Window;

/// A batch of windows ready for a forward pass.
#[derive(Debug, Clone)]
pub struct WindowBatch<B: Backend> {
    /// Scaled ids — shape: [batch_size, window_length, 1]
    pub inputs: Tensor<B, 3>,

    /// One-hot targets — shape: [batch_size, vocab_size]
    pub targets: Tensor<B, 2>,
}

/// Holds the device plus the V used for scaling and one-hot width.
#[derive(Clone, Debug)]
pub struct WindowBatcher<B: Backend> {
    pub device: B::Device,
    vocab_size: usize,
}

impl<B: Backend> WindowBatcher<B> {
    pub fn new(device: B::Device, vocab_size: usize) -> Self {
        Self { device, vocab_size }
    }

    pub fn batch(&self, items: &[&Window]) -> WindowBatch<B> {
        let batch_size = items.len();
        let divisor = self.vocab_size as f32;

        let rows: Vec<Vec<f32>> = items.iter().map(|w| w.scaled_input(divisor)).collect();
        let window_length = rows.first().map_or(0, Vec::len);
        let input_flat: Vec<f32> = rows.into_iter().flatten().collect();

        let target_flat: Vec<f32> = items
            .iter()
            .flat_map(|w| w.one_hot_target(self.vocab_size))
            .collect();

        let inputs = Tensor::<B, 1>::from_floats(input_flat.as_slice(), &self.device)
            .reshape([batch_size, window_length, 1]);

        let targets = Tensor::<B, 1>::from_floats(target_flat.as_slice(), &self.device)
            .reshape([batch_size, self.vocab_size]);

        WindowBatch { inputs, targets }
    }
}

/// Stack already-scaled windows into a [batch, W, 1] input tensor.
pub fn input_tensor<B: Backend>(rows: &[Vec<f32>], device: &B::Device) -> Result<Tensor<B, 3>> {
    let Some(first) = rows.first() else {
        bail!("cannot build an input tensor from zero windows");
    };
    let window_length = first.len();
    if window_length == 0 {
        bail!("input windows must hold at least one token");
    }
    if let Some(bad) = rows.iter().find(|r| r.len() != window_length) {
        bail!(
            "input windows differ in length: {} vs {}",
            window_length,
            bad.len()
        );
    }

    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Ok(Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([rows.len(), window_length, 1]))
}
