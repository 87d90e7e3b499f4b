// ============================================================
// Layer 3 — Windows and Generation State
// ============================================================
// A Window is W consecutive token ids plus the id that follows
// them. The model never sees raw ids: inputs are divided by the
// vocabulary size V, and targets are one-hot vectors over V.
//
// GenerationState is the same W-long window, but it slides:
// each generated id is pushed on the right while the oldest id
// falls off the left, so its length never changes.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One training example: `input` ids and the `target` id that follows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub input: Vec<u32>,
    pub target: u32,
}

impl Window {
    pub fn new(input: Vec<u32>, target: u32) -> Self {
        Self { input, target }
    }

    /// Input ids as a (W, 1) column, each divided by `divisor`.
    pub fn scaled_input(&self, divisor: f32) -> Vec<f32> {
        scale(self.input.iter().copied(), divisor)
    }

    /// Target as a one-hot row over `classes`.
    pub fn one_hot_target(&self, classes: usize) -> Vec<f32> {
        let mut row = vec![0.0; classes];
        if let Some(slot) = row.get_mut(self.target as usize) {
            *slot = 1.0;
        }
        row
    }
}

fn scale(ids: impl Iterator<Item = u32>, divisor: f32) -> Vec<f32> {
    ids.map(|id| id as f32 / divisor).collect()
}

// ─── GenerationState ──────────────────────────────────────────────────────────

/// Sliding window of ids fed back into the model during generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationState {
    ids: VecDeque<u32>,
}

impl GenerationState {
    /// Start from a copy of a dataset window's input.
    pub fn from_window(window: &Window) -> Self {
        Self {
            ids: window.input.iter().copied().collect(),
        }
    }

    /// Drop the oldest id and append `id`; the length stays the same.
    pub fn advance(&mut self, id: u32) {
        self.ids.pop_front();
        self.ids.push_back(id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    /// Current window, scaled the same way training inputs were.
    pub fn scaled(&self, divisor: f32) -> Vec<f32> {
        scale(self.ids(), divisor)
    }
}
