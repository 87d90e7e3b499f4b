// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Samples a new piece from the committed checkpoint:
//
//   Step 1: Check a checkpoint exists      (Layer 6 - infra)
//   Step 2: Load training config + vocab   (Layer 6 - infra)
//   Step 3: Rebuild the windows            (Layer 4 - data)
//   Step 4: Rebuild model, load weights    (Layer 5 - ml)
//   Step 5: Seed the RNG                   (logged, to reproduce)
//   Step 6: Run the generation engine      (Layer 5 - ml)
//   Step 7: Write tokens JSON + MIDI       (Layer 6 - infra)
//
// The corpus is encoded with the SAVED vocabulary, never a new
// one, so ids mean the same thing they meant during training.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::data::{dataset::WindowedDataset, loader::CorpusLoader};
use crate::domain::token::Token;
use crate::domain::traits::{CorpusSource, SequenceModel};
use crate::infra::{
    atomic::atomic_write,
    checkpoint::{CheckpointManager, CheckpointRecord},
    midi_writer::write_midi,
    vocab_store::VocabularyStore,
};
use crate::ml::{
    generator::{GenerationEngine, STEPS},
    model::{rmsprop_model, TrainBackend},
};

const TOKENS_FILE: &str = "generated_tokens.json";
const MIDI_FILE: &str = "output.mid";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub corpus: String,
    pub checkpoint_dir: String,
    pub steps: usize,
    /// Fresh random seed when absent
    pub seed: Option<u64>,
    pub output_dir: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            corpus: "data/notes.json".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            steps: STEPS,
            seed: None,
            output_dir: "output".to_string(),
        }
    }
}

/// A finished generation run.
#[derive(Debug, Clone)]
pub struct GeneratedPiece {
    pub tokens: Vec<Token>,
    pub seed: u64,
    pub tokens_path: PathBuf,
    pub midi_path: PathBuf,
}

pub struct GenerateUseCase {
    config: GenerateConfig,
}

impl GenerateUseCase {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    /// Generate with the LSTM on the WGPU device.
    pub fn execute(&self) -> Result<GeneratedPiece> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        self.execute_with(|train_cfg, record| {
            Ok(rmsprop_model::<TrainBackend>(
                train_cfg.network_config(record.vocab_size),
                train_cfg.fit_options(),
                device,
            ))
        })
    }

    /// Run the pipeline with the model `build` returns. `build` is not
    /// called when no checkpoint has been committed.
    pub fn execute_with<M, F>(&self, build: F) -> Result<GeneratedPiece>
    where
        M: SequenceModel,
        F: FnOnce(&TrainConfig, &CheckpointRecord) -> Result<M>,
    {
        let cfg = &self.config;

        // ── Step 1: A checkpoint must exist before anything is built ─────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir);
        checkpoints.require_weights()?;

        // ── Step 2: Training config and vocabulary ────────────────────────────
        let train_cfg: TrainConfig = checkpoints.load_config()?;
        let vocabulary = VocabularyStore::new(&cfg.checkpoint_dir).load()?;
        tracing::info!("Loaded vocabulary of {} tokens", vocabulary.len());

        // ── Step 3: Windows to seed from ──────────────────────────────────────
        let corpus = CorpusLoader::new(&cfg.corpus).load_corpus()?;
        let unknown = corpus.iter().filter(|t| !vocabulary.contains(t)).count();
        if unknown > 0 {
            tracing::warn!("{} corpus tokens are not in the saved vocabulary", unknown);
        }
        let dataset = WindowedDataset::from_corpus(&corpus, &vocabulary, train_cfg.window)?;

        // ── Step 4: Model with the committed weights ──────────────────────────
        let engine = GenerationEngine::from_checkpoint(&checkpoints, |record| {
            build(&train_cfg, record)
        })?;
        tracing::info!(
            "Restored epoch {} (loss {:.4})",
            engine.record().epoch + 1,
            engine.record().loss
        );

        // ── Step 5: Seed ──────────────────────────────────────────────────────
        let seed = cfg.seed.unwrap_or_else(|| rand::thread_rng().gen());
        tracing::info!("Sampling {} steps with seed {}", cfg.steps, seed);
        let mut rng = StdRng::seed_from_u64(seed);

        // ── Step 6: Generate ──────────────────────────────────────────────────
        let tokens = engine.run(&vocabulary, &dataset, cfg.steps, &mut rng)?;

        // ── Step 7: Write the piece ───────────────────────────────────────────
        let out = Path::new(&cfg.output_dir);
        let tokens_path = out.join(TOKENS_FILE);
        let json = serde_json::to_vec_pretty(&tokens)?;
        atomic_write(&tokens_path, &json)
            .with_context(|| format!("Cannot write '{}'", tokens_path.display()))?;

        let midi_path = out.join(MIDI_FILE);
        write_midi(&tokens, &midi_path)?;

        Ok(GeneratedPiece {
            tokens,
            seed,
            tokens_path,
            midi_path,
        })
    }
}
