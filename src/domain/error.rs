// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Every failure the core can report, grouped by kind:
//
//   Precondition — the inputs cannot work (empty corpus, too
//                  few tokens, a zero-length window, no
//                  checkpoint on disk)
//   Consistency  — training and generation disagree about the
//                  vocabulary
//   Capability   — the model itself failed while fitting or
//                  predicting
//   Storage      — reading or writing an artefact failed
//
// All of them end the current run. Nothing in the core retries.
// Display shows only this layer's message; the cause is reached
// through `source()`, so `{:#}` chains print it exactly once.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause from the model or the filesystem.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Consistency,
    Capability,
    Storage,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("corpus is empty")]
    EmptyCorpus,

    #[error("corpus has {tokens} tokens, need more than the window length {window_length}")]
    InsufficientData { tokens: usize, window_length: usize },

    #[error("window length must be at least 1")]
    ZeroWindow,

    #[error("no checkpoint at '{}'; run training first", .0.display())]
    MissingCheckpoint(PathBuf),

    #[error("vocabulary mismatch: {0}")]
    VocabularyMismatch(String),

    #[error("token '{0}' is not in the vocabulary")]
    UnknownToken(String),

    #[error("fit failed at epoch {epoch}")]
    Fit {
        epoch: usize,
        #[source]
        source: Cause,
    },

    #[error("predict failed at step {step}")]
    Predict {
        step: usize,
        #[source]
        source: Cause,
    },

    #[error("training ran {epochs} epochs without producing a checkpoint")]
    NoCheckpoint { epochs: usize },

    #[error("{context}")]
    Storage {
        context: String,
        #[source]
        source: Cause,
    },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyCorpus
            | Self::InsufficientData { .. }
            | Self::ZeroWindow
            | Self::MissingCheckpoint(_) => ErrorKind::Precondition,
            Self::VocabularyMismatch(_) | Self::UnknownToken(_) => ErrorKind::Consistency,
            Self::Fit { .. } | Self::Predict { .. } | Self::NoCheckpoint { .. } => {
                ErrorKind::Capability
            }
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Epoch or step at which the run stopped, when there is one.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Fit { epoch, .. } => Some(*epoch),
            Self::Predict { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn storage(context: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::Storage {
            context: context.into(),
            source: source.into(),
        }
    }
}
