// ============================================================
// Layer 5 — Generation Engine
// ============================================================
// Autoregressive sampling from a trained checkpoint.
//
//   Initial:  pick a random window from the dataset's inputs
//             and copy it as the generation state (W ids)
//   Step:     scale the state by 1/V, predict a distribution
//             over V ids, DRAW one id from it (weighted, never
//             arg-max), decode it, then slide the state: drop
//             the oldest id, append the new one
//   Terminal: after `steps` steps, return the decoded tokens
//
// Always taking the most likely id makes the output fall into
// short loops, so the draw is what keeps it musical.
//
// Before sampling starts we check that the vocabulary, the
// dataset and the model all agree on V, and that the vocabulary
// is the exact token list the checkpoint was trained on (by
// fingerprint). A mismatched vocabulary of the same size decodes
// to the wrong tokens without any other visible error.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::data::dataset::WindowedDataset;
use crate::data::vocabulary::Vocabulary;
use crate::domain::error::PipelineError;
use crate::domain::token::Token;
use crate::domain::traits::SequenceModel;
use crate::domain::window::GenerationState;
use crate::infra::checkpoint::{CheckpointManager, CheckpointRecord};

/// Tokens produced per generation run.
pub const STEPS: usize = 500;

/// Sample `steps` tokens from `model`, seeded from a random dataset window.
pub fn generate<M, R>(
    model: &M,
    vocabulary: &Vocabulary,
    dataset: &WindowedDataset,
    steps: usize,
    rng: &mut R,
) -> Result<Vec<Token>, PipelineError>
where
    M: SequenceModel,
    R: Rng,
{
    check_sizes(model, vocabulary, dataset)?;
    if dataset.is_empty() {
        return Err(PipelineError::InsufficientData {
            tokens: 0,
            window_length: dataset.window_length(),
        });
    }

    let start = rng.gen_range(0..dataset.len());
    let mut state = dataset
        .window(start)
        .map(GenerationState::from_window)
        .ok_or_else(|| PipelineError::InsufficientData {
            tokens: dataset.len(),
            window_length: dataset.window_length(),
        })?;
    tracing::debug!("Seeding generation from window {} ({} ids)", start, state.len());

    let divisor = dataset.divisor();
    let mut output = Vec::with_capacity(steps);

    for step in 0..steps {
        let id = next_id(model, &state, divisor, rng).map_err(|source| {
            PipelineError::Predict { step, source }
        })?;

        let token = vocabulary.decode(id).ok_or_else(|| {
            PipelineError::VocabularyMismatch(format!(
                "model produced id {id} but the vocabulary has {} tokens",
                vocabulary.len()
            ))
        })?;
        output.push(token.clone());
        state.advance(id);
    }

    tracing::info!("Generated {} tokens", output.len());
    Ok(output)
}

fn check_sizes<M: SequenceModel>(
    model: &M,
    vocabulary: &Vocabulary,
    dataset: &WindowedDataset,
) -> Result<(), PipelineError> {
    if model.num_classes() != vocabulary.len() {
        return Err(PipelineError::VocabularyMismatch(format!(
            "model predicts {} classes but the vocabulary has {} tokens",
            model.num_classes(),
            vocabulary.len()
        )));
    }
    if dataset.vocab_size() != vocabulary.len() {
        return Err(PipelineError::VocabularyMismatch(format!(
            "dataset was scaled by {} but the vocabulary has {} tokens",
            dataset.vocab_size(),
            vocabulary.len()
        )));
    }
    if dataset.vocab_fingerprint() != vocabulary.fingerprint() {
        return Err(PipelineError::VocabularyMismatch(
            "dataset was encoded with a different vocabulary".to_string(),
        ));
    }
    Ok(())
}

/// One predict-and-draw step.
fn next_id<M, R>(
    model: &M,
    state: &GenerationState,
    divisor: f32,
    rng: &mut R,
) -> Result<u32, crate::domain::error::Cause>
where
    M: SequenceModel,
    R: Rng,
{
    let input = state.scaled(divisor);
    let mut rows = model.predict(std::slice::from_ref(&input))?;
    let Some(distribution) = rows.pop() else {
        return Err("model returned no prediction".into());
    };
    if distribution.len() != model.num_classes() {
        return Err(format!(
            "distribution has {} entries, expected {}",
            distribution.len(),
            model.num_classes()
        )
        .into());
    }

    if let Some(bad) = distribution.iter().find(|p| !p.is_finite()) {
        return Err(format!("distribution contains {bad}").into());
    }

    // Rejects negative and all-zero weights.
    let weighted = WeightedIndex::new(&distribution)?;
    Ok(weighted.sample(rng) as u32)
}

// ─── GenerationEngine ─────────────────────────────────────────────────────────

/// A model restored from the committed checkpoint, ready to sample.
pub struct GenerationEngine<M> {
    model: M,
    record: CheckpointRecord,
}

impl<M: SequenceModel> GenerationEngine<M> {
    /// Check the checkpoint exists, then build the model with `build`
    /// and load the committed weights into it.
    ///
    /// `build` is not called at all when there is no checkpoint.
    pub fn from_checkpoint<F>(checkpoints: &CheckpointManager, build: F) -> Result<Self, PipelineError>
    where
        F: FnOnce(&CheckpointRecord) -> anyhow::Result<M>,
    {
        checkpoints.require_weights()?;
        let record = checkpoints.load_record()?;

        let mut model = build(&record)
            .map_err(|e| PipelineError::storage("Cannot construct the model", e))?;
        checkpoints.load_into(&mut model)?;

        Ok(Self { model, record })
    }

    pub fn record(&self) -> &CheckpointRecord {
        &self.record
    }

    /// Generate `steps` tokens. The vocabulary must be the one the
    /// checkpoint was trained with.
    pub fn run<R: Rng>(
        &self,
        vocabulary: &Vocabulary,
        dataset: &WindowedDataset,
        steps: usize,
        rng: &mut R,
    ) -> Result<Vec<Token>, PipelineError> {
        if vocabulary.len() != self.record.vocab_size {
            return Err(PipelineError::VocabularyMismatch(format!(
                "checkpoint was trained on {} tokens but the vocabulary has {}",
                self.record.vocab_size,
                vocabulary.len()
            )));
        }
        let fingerprint = vocabulary.fingerprint();
        if fingerprint != self.record.vocab_fingerprint {
            return Err(PipelineError::VocabularyMismatch(format!(
                "checkpoint was trained on vocabulary {} but this one is {}",
                self.record.vocab_fingerprint, fingerprint
            )));
        }
        if dataset.window_length() != self.record.window_length {
            return Err(PipelineError::VocabularyMismatch(format!(
                "checkpoint expects windows of {} but the dataset uses {}",
                self.record.window_length,
                dataset.window_length()
            )));
        }
        generate(&self.model, vocabulary, dataset, steps, rng)
    }
}
