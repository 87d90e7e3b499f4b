// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the token corpus          (Layer 4 - data)
//   Step 2: Build vocabulary + windows     (Layer 4 - data)
//   Step 3: Stage config + vocabulary      (Layer 6 - infra)
//   Step 4: Build the network              (Layer 5 - ml)
//   Step 5: Run the training controller    (Layer 5 - ml)
//           metrics CSV row per epoch      (Layer 6 - infra)
//   Step 6: Publish the metrics CSV        (Layer 6 - infra)
//
// Nothing in the checkpoint directory changes until the controller
// commits: weights, config, vocabulary and record are renamed into
// place together. A run that fails earlier leaves the previous
// checkpoint exactly as it was.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

use crate::data::{
    dataset::{build_dataset, WINDOW_LENGTH},
    loader::CorpusLoader,
};
use crate::domain::traits::{CorpusSource, SequenceModel};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    model::{rmsprop_model, FitOptions, LstmNetworkConfig, TrainBackend},
    trainer::{CheckpointResult, TrainingController, EPOCHS, TARGET_LOSS},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the checkpoint so generation can rebuild the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub corpus: String,
    pub checkpoint_dir: String,
    pub epochs: usize,
    pub target_loss: f64,
    pub window: usize,
    pub batch_size: usize,
    pub lr: f64,
    pub hidden_size: usize,
    pub dense_size: usize,
    pub dropout: f64,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus: "data/notes.json".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            epochs: EPOCHS,
            target_loss: TARGET_LOSS,
            window: WINDOW_LENGTH,
            batch_size: 32,
            lr: 1e-3,
            hidden_size: 512,
            dense_size: 256,
            dropout: 0.2,
            seed: 42,
        }
    }
}

impl TrainConfig {
    pub fn network_config(&self, num_classes: usize) -> LstmNetworkConfig {
        LstmNetworkConfig::new(num_classes)
            .with_hidden_size(self.hidden_size)
            .with_dense_size(self.dense_size)
            .with_dropout(self.dropout)
    }

    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            batch_size: self.batch_size,
            learning_rate: self.lr,
            seed: self.seed,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train the LSTM on the WGPU device.
    pub fn execute(&self) -> Result<CheckpointResult> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        self.execute_with(|cfg, num_classes| {
            Ok(rmsprop_model::<TrainBackend>(
                cfg.network_config(num_classes),
                cfg.fit_options(),
                device,
            ))
        })
    }

    /// Run the pipeline with whatever model `build` returns for the
    /// corpus' vocabulary size.
    pub fn execute_with<M, F>(&self, build: F) -> Result<CheckpointResult>
    where
        M: SequenceModel,
        F: FnOnce(&TrainConfig, usize) -> Result<M>,
    {
        let cfg = &self.config;

        // ── Step 1: Load the corpus ──────────────────────────────────────────
        tracing::info!("Loading corpus from '{}'", cfg.corpus);
        let corpus = CorpusLoader::new(&cfg.corpus).load_corpus()?;

        // ── Step 2: Vocabulary and training windows ───────────────────────────
        let (vocabulary, dataset) = build_dataset(&corpus, cfg.window)?;
        tracing::info!(
            "{} tokens, {} distinct, {} windows of length {}",
            corpus.len(),
            vocabulary.len(),
            dataset.len(),
            dataset.window_length()
        );

        // ── Step 3: Config and vocabulary go in with the weights ─────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir)
            .with_config(cfg)?
            .with_vocabulary(&vocabulary)?;

        // ── Step 4: Build the model ──────────────────────────────────────────
        let mut model = build(cfg, vocabulary.len())?;

        // ── Step 5: Train and commit the closest-to-target epoch ─────────────
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
        let controller = TrainingController::new(cfg.epochs, cfg.target_loss);
        let result = controller.run(&mut model, &dataset, &checkpoints, |report| {
            if let Err(e) = metrics.log(&EpochMetrics::from(report)) {
                tracing::warn!("Could not record metrics for epoch {}: {e:#}", report.epoch + 1);
            }
            ControlFlow::Continue(())
        })?;

        // ── Step 6: Metrics of the run that was just committed ───────────────
        match metrics.finish() {
            Ok(path) => tracing::info!("Metrics saved to '{}'", path.display()),
            Err(e) => tracing::warn!("Could not save metrics: {e:#}"),
        }

        tracing::info!(
            "Kept epoch {} of {} (loss {:.4}, {:.4} from target)",
            result.record.epoch + 1,
            result.record.epochs_run,
            result.record.loss,
            result.record.distance
        );
        Ok(result)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::PipelineError;
    use crate::domain::token::Token;
    use crate::infra::vocab_store::VocabularyStore;
    use crate::ml::stub::StubModel;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    /// Every file in `dir` with its bytes. Subdirectories are skipped.
    fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_file())
            .map(|p| {
                let name = p.file_name().unwrap().to_string_lossy().into_owned();
                (name, fs::read(&p).unwrap())
            })
            .collect()
    }

    fn write_corpus(dir: &Path, tokens: &[&str]) -> String {
        let path = dir.join("notes.json");
        let tokens: Vec<Token> = tokens.iter().map(|t| Token::from(*t)).collect();
        CorpusLoader::new(&path).save(&tokens).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn config(dir: &Path, corpus: String) -> TrainConfig {
        TrainConfig {
            corpus,
            checkpoint_dir: dir.join("ckpt").to_string_lossy().into_owned(),
            epochs: 3,
            window: 4,
            ..TrainConfig::default()
        }
    }

    fn melody() -> Vec<&'static str> {
        ["C4", "E4", "G4", "Rest", "C4.E4.G4"]
            .iter()
            .copied()
            .cycle()
            .take(30)
            .collect()
    }

    #[test]
    fn test_training_writes_all_artefacts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), write_corpus(dir.path(), &melody()));
        let ckpt_dir = Path::new(&cfg.checkpoint_dir).to_path_buf();

        let result = TrainUseCase::new(cfg.clone())
            .execute_with(|_, classes| {
                assert_eq!(classes, 5);
                Ok(StubModel::new(classes).with_losses(&[0.9, 0.3, 0.25]))
            })
            .unwrap();

        assert_eq!(result.record.epoch, 2);
        assert_eq!(result.record.vocab_size, 5);
        assert!(ckpt_dir.join("best_weights.mpk").is_file());
        assert!(ckpt_dir.join("checkpoint.json").is_file());
        assert_eq!(VocabularyStore::new(&ckpt_dir).load().unwrap().len(), 5);

        let saved: TrainConfig = CheckpointManager::new(&ckpt_dir).load_config().unwrap();
        assert_eq!(saved, cfg);

        let csv = fs::read_to_string(ckpt_dir.join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_short_corpus_trains_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), write_corpus(dir.path(), &["C4", "D4", "E4"]));

        let err = TrainUseCase::new(cfg)
            .execute_with(|_, classes| Ok(StubModel::new(classes)))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InsufficientData { tokens: 3, window_length: 4 })
        ));
    }

    #[test]
    fn test_failed_fit_leaves_no_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), write_corpus(dir.path(), &melody()));
        let ckpt_dir = Path::new(&cfg.checkpoint_dir).to_path_buf();

        let err = TrainUseCase::new(cfg)
            .execute_with(|_, classes| Ok(StubModel::new(classes).failing_fit_on(1)))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Fit { epoch: 1, .. })
        ));
        assert!(!ckpt_dir.join("best_weights.mpk").exists());
        assert!(!ckpt_dir.join("vocabulary.json").exists());
    }

    #[test]
    fn test_failed_retrain_keeps_previous_checkpoint_intact() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), write_corpus(dir.path(), &melody()));
        let ckpt_dir = Path::new(&cfg.checkpoint_dir).to_path_buf();

        TrainUseCase::new(cfg.clone())
            .execute_with(|_, classes| Ok(StubModel::new(classes).with_losses(&[0.9, 0.3, 0.25])))
            .unwrap();
        let before = snapshot(&ckpt_dir);
        assert_eq!(before.len(), 5);

        let retrain = TrainConfig {
            hidden_size: 64,
            ..cfg.clone()
        };
        let err = TrainUseCase::new(retrain)
            .execute_with(|_, classes| Ok(StubModel::new(classes).failing_fit_on(0)))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Fit { epoch: 0, .. })
        ));

        assert_eq!(snapshot(&ckpt_dir), before);
        let saved: TrainConfig = CheckpointManager::new(&ckpt_dir).load_config().unwrap();
        assert_eq!(saved.hidden_size, cfg.hidden_size);
    }

    #[test]
    fn test_vocabulary_stage_failure_keeps_previous_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), write_corpus(dir.path(), &melody()));
        let ckpt_dir = Path::new(&cfg.checkpoint_dir).to_path_buf();

        TrainUseCase::new(cfg.clone())
            .execute_with(|_, classes| Ok(StubModel::new(classes)))
            .unwrap();
        let before = snapshot(&ckpt_dir);

        // same vocabulary size, different tokens
        let other: Vec<&str> = ["D4", "F4", "A4", "Rest", "D4.F4.A4"]
            .iter()
            .copied()
            .cycle()
            .take(30)
            .collect();
        let retrain = config(dir.path(), write_corpus(dir.path(), &other));
        fs::create_dir(ckpt_dir.join(".vocabulary.json.partial")).unwrap();

        let err = TrainUseCase::new(retrain)
            .execute_with(|_, classes| Ok(StubModel::new(classes)))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Storage { .. })
        ));
        assert_eq!(snapshot(&ckpt_dir), before);
        let vocab = VocabularyStore::new(&ckpt_dir).load().unwrap();
        assert!(vocab.contains(&Token::from("C4")));
    }
}
