// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Owns the checkpoint directory. One training run produces
// exactly one checkpoint, which replaces the previous one:
//
//   checkpoints/
//     best_weights.mpk   ← weights of the selected epoch
//     train_config.json  ← hyperparameters to rebuild the model
//     vocabulary.json    ← id → token list the model was fit on
//     checkpoint.json    ← which epoch, its loss, V, W and the
//                          vocabulary fingerprint
//
// A commit is one unit. Every file is first written to a hidden
// temp sibling; only when all of them are on disk are they renamed
// over the old ones, checkpoint.json last. A run that fails before
// that point leaves the previous checkpoint byte-for-byte intact.
//
// Why save the config separately?
//   Generation has to rebuild the exact network (hidden sizes,
//   number of classes) before the weights can be loaded into it.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs, iter, path::PathBuf};

use crate::data::vocabulary::Vocabulary;
use crate::domain::error::PipelineError;
use crate::domain::traits::SequenceModel;
use crate::infra::atomic;
use crate::infra::vocab_store::{VocabularyStore, VOCAB_FILE};

const WEIGHTS_FILE: &str = "best_weights.mpk";
const RECORD_FILE: &str = "checkpoint.json";
const CONFIG_FILE: &str = "train_config.json";

/// What was selected: written next to the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Zero-based epoch whose weights were kept
    pub epoch: usize,
    /// Training loss reported for that epoch
    pub loss: f64,
    /// |loss − target_loss|
    pub distance: f64,
    pub target_loss: f64,
    /// Epochs actually run (fewer than planned if stopped early)
    pub epochs_run: usize,
    /// Vocabulary size the model was trained against
    pub vocab_size: usize,
    pub window_length: usize,
    /// `Vocabulary::fingerprint` of that vocabulary
    pub vocab_fingerprint: String,
}

/// (temp file, final path) pairs, in the order they are renamed.
type Staged = Vec<(PathBuf, PathBuf)>;

pub struct CheckpointManager {
    dir: PathBuf,
    /// Files committed together with the weights, before the record.
    companions: Vec<(&'static str, Vec<u8>)>,
    vocab_fingerprint: Option<String>,
}

impl CheckpointManager {
    /// Create a manager for `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self {
            dir,
            companions: Vec::new(),
            vocab_fingerprint: None,
        }
    }

    /// Commit `cfg` as train_config.json with the next checkpoint.
    pub fn with_config<T: Serialize>(mut self, cfg: &T) -> Result<Self, PipelineError> {
        let json = serde_json::to_vec_pretty(cfg)
            .map_err(|e| PipelineError::storage("Cannot serialise training config", e))?;
        self.companions.push((CONFIG_FILE, json));
        Ok(self)
    }

    /// Commit `vocab` as vocabulary.json with the next checkpoint. The
    /// record being committed must carry the same fingerprint.
    pub fn with_vocabulary(mut self, vocab: &Vocabulary) -> Result<Self, PipelineError> {
        self.companions
            .push((VOCAB_FILE, VocabularyStore::to_json(vocab)?));
        self.vocab_fingerprint = Some(vocab.fingerprint());
        Ok(self)
    }

    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(WEIGHTS_FILE)
    }

    pub fn has_weights(&self) -> bool {
        self.weights_path().is_file()
    }

    /// Path of the committed weights, or `MissingCheckpoint`.
    pub fn require_weights(&self) -> Result<PathBuf, PipelineError> {
        if self.has_weights() {
            Ok(self.weights_path())
        } else {
            Err(PipelineError::MissingCheckpoint(self.weights_path()))
        }
    }

    /// Persist the model's current weights, the companion files and
    /// `record`, replacing whatever checkpoint was there before.
    pub fn commit<M: SequenceModel>(
        &self,
        model: &M,
        record: &CheckpointRecord,
    ) -> Result<PathBuf, PipelineError> {
        if let Some(expected) = &self.vocab_fingerprint {
            if *expected != record.vocab_fingerprint {
                return Err(PipelineError::VocabularyMismatch(format!(
                    "record fingerprint {} does not match the staged vocabulary {}",
                    record.vocab_fingerprint, expected
                )));
            }
        }
        fs::create_dir_all(&self.dir)
            .map_err(|e| PipelineError::storage("Cannot create checkpoint directory", e))?;

        let mut staged = Staged::new();
        let result = self
            .stage(model, record, &mut staged)
            .and_then(|()| publish(&staged));
        if result.is_err() {
            for (temp, _) in &staged {
                let _ = fs::remove_file(temp);
            }
        }
        result?;

        let path = self.weights_path();
        tracing::info!(
            "Checkpoint from epoch {} (loss {:.4}) saved to '{}'",
            record.epoch,
            record.loss,
            path.display()
        );
        Ok(path)
    }

    /// Write every file of the checkpoint to its temp sibling. Nothing
    /// already committed is touched here.
    fn stage<M: SequenceModel>(
        &self,
        model: &M,
        record: &CheckpointRecord,
        staged: &mut Staged,
    ) -> Result<(), PipelineError> {
        let path = self.weights_path();
        let temp = atomic::temp_path(&path)
            .map_err(|e| PipelineError::storage("Bad checkpoint path", e))?;
        staged.push((temp.clone(), path));
        model
            .save_weights(&temp)
            .map_err(|e| PipelineError::storage("Failed to write weights", e))?;

        let record_json = serde_json::to_vec_pretty(record)
            .map_err(|e| PipelineError::storage("Cannot serialise checkpoint record", e))?;
        let files = self
            .companions
            .iter()
            .map(|(name, bytes)| (*name, bytes.as_slice()))
            .chain(iter::once((RECORD_FILE, record_json.as_slice())));

        for (name, bytes) in files {
            let path = self.dir.join(name);
            let temp = atomic::stage(&path, bytes).map_err(|e| {
                PipelineError::storage(format!("Cannot stage '{}'", path.display()), e)
            })?;
            staged.push((temp, path));
        }
        Ok(())
    }

    /// Load the committed weights into `model`.
    pub fn load_into<M: SequenceModel>(&self, model: &mut M) -> Result<(), PipelineError> {
        let path = self.require_weights()?;
        model.load_weights(&path).map_err(|e| {
            PipelineError::storage(format!("Cannot load weights from '{}'", path.display()), e)
        })?;
        tracing::info!("Weights loaded from '{}'", path.display());
        Ok(())
    }

    pub fn load_record(&self) -> Result<CheckpointRecord, PipelineError> {
        let path = self.dir.join(RECORD_FILE);
        let json = fs::read(&path).map_err(|e| {
            PipelineError::storage(format!("Cannot read '{}'", path.display()), e)
        })?;
        serde_json::from_slice(&json).map_err(|e| {
            PipelineError::storage(format!("Malformed checkpoint record '{}'", path.display()), e)
        })
    }

    pub fn load_config<T: DeserializeOwned>(&self) -> Result<T> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'generate'.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Rename every staged file over its final path, in order.
fn publish(staged: &[(PathBuf, PathBuf)]) -> Result<(), PipelineError> {
    for (temp, path) in staged {
        atomic::commit(temp, path).map_err(|e| {
            PipelineError::storage(format!("Failed to replace '{}'", path.display()), e)
        })?;
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::Token;
    use crate::ml::stub::StubModel;
    use std::collections::BTreeMap;

    fn vocab(names: &[&str]) -> Vocabulary {
        let tokens: Vec<Token> = names.iter().map(|n| Token::from(*n)).collect();
        Vocabulary::build(&tokens).unwrap()
    }

    fn record() -> CheckpointRecord {
        CheckpointRecord {
            epoch: 2,
            loss: 0.25,
            distance: 0.05,
            target_loss: 0.2,
            epochs_run: 4,
            vocab_size: 3,
            window_length: 4,
            vocab_fingerprint: vocab(&["C", "D", "E"]).fingerprint(),
        }
    }

    /// Every regular file in `dir` with its bytes.
    fn snapshot(dir: &std::path::Path) -> BTreeMap<String, Vec<u8>> {
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

    #[test]
    fn test_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        assert!(!ckpt.has_weights());
        assert!(matches!(
            ckpt.require_weights(),
            Err(PipelineError::MissingCheckpoint(_))
        ));
    }

    #[test]
    fn test_commit_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());

        let mut model = StubModel::new(3);
        model.set_weights(41);
        ckpt.commit(&model, &record()).unwrap();
        assert!(ckpt.has_weights());
        assert_eq!(ckpt.load_record().unwrap(), record());

        let mut fresh = StubModel::new(3);
        ckpt.load_into(&mut fresh).unwrap();
        assert_eq!(fresh.get_weights(), 41);
    }

    #[test]
    fn test_commit_replaces_previous_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let mut model = StubModel::new(3);

        model.set_weights(1);
        ckpt.commit(&model, &record()).unwrap();
        model.set_weights(2);
        ckpt.commit(&model, &record()).unwrap();

        let mut fresh = StubModel::new(3);
        ckpt.load_into(&mut fresh).unwrap();
        assert_eq!(fresh.get_weights(), 2);
    }

    #[test]
    fn test_failed_save_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let model = StubModel::new(3).failing_save();

        let err = ckpt.commit(&model, &record()).unwrap_err();
        assert!(matches!(err, PipelineError::Storage { .. }));
        assert!(!ckpt.has_weights());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_config_and_vocabulary_commit_with_the_weights() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path())
            .with_config(&vec![1usize, 2, 3])
            .unwrap()
            .with_vocabulary(&vocab(&["C", "D", "E"]))
            .unwrap();

        // nothing is written before the commit
        assert!(snapshot(dir.path()).is_empty());

        ckpt.commit(&StubModel::new(3), &record()).unwrap();
        let loaded: Vec<usize> = ckpt.load_config().unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);
        let stored = VocabularyStore::new(dir.path()).load().unwrap();
        assert_eq!(stored.fingerprint(), record().vocab_fingerprint);
        assert_eq!(snapshot(dir.path()).len(), 4);
    }

    #[test]
    fn test_failed_companion_stage_keeps_previous_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = StubModel::new(3);
        model.set_weights(1);
        CheckpointManager::new(dir.path())
            .with_config(&"first")
            .unwrap()
            .with_vocabulary(&vocab(&["C", "D", "E"]))
            .unwrap()
            .commit(&model, &record())
            .unwrap();
        let before = snapshot(dir.path());

        // a directory where the vocabulary temp file would go
        fs::create_dir(dir.path().join(".vocabulary.json.partial")).unwrap();
        let other = vocab(&["F", "G", "A"]);
        let mut second = record();
        second.vocab_fingerprint = other.fingerprint();
        model.set_weights(2);
        let err = CheckpointManager::new(dir.path())
            .with_config(&"second")
            .unwrap()
            .with_vocabulary(&other)
            .unwrap()
            .commit(&model, &second)
            .unwrap_err();

        assert!(matches!(err, PipelineError::Storage { .. }));
        assert_eq!(snapshot(dir.path()), before);
    }

    #[test]
    fn test_record_must_match_staged_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path())
            .with_vocabulary(&vocab(&["F", "G", "A"]))
            .unwrap();
        let err = ckpt.commit(&StubModel::new(3), &record()).unwrap_err();
        assert!(matches!(err, PipelineError::VocabularyMismatch(_)));
        assert!(!ckpt.has_weights());
    }
}
