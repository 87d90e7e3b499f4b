// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the sorted token list the model was trained against,
// so generation decodes ids with exactly the same mapping:
//
//   checkpoints/vocabulary.json  ← ["C4", "C4.E4.G4", "E-4", "Rest", ...]
//
// Ids are positions in that list. A file that is not strictly
// sorted, or is empty, is rejected as a vocabulary mismatch.
//
// The file is only ever written by CheckpointManager::commit, in
// the same unit as the weights it belongs to.

use std::{fs, path::PathBuf};

use crate::data::vocabulary::Vocabulary;
use crate::domain::error::PipelineError;
use crate::domain::token::Token;

pub const VOCAB_FILE: &str = "vocabulary.json";

pub struct VocabularyStore {
    dir: PathBuf,
}

impl VocabularyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(VOCAB_FILE)
    }

    /// The bytes `load` reads back.
    pub fn to_json(vocab: &Vocabulary) -> Result<Vec<u8>, PipelineError> {
        serde_json::to_vec_pretty(vocab.tokens())
            .map_err(|e| PipelineError::storage("Cannot serialise vocabulary", e))
    }

    pub fn load(&self) -> Result<Vocabulary, PipelineError> {
        let path = self.path();
        let json = fs::read(&path).map_err(|e| {
            PipelineError::storage(format!("Cannot read vocabulary '{}'", path.display()), e)
        })?;
        let tokens: Vec<Token> = serde_json::from_slice(&json).map_err(|e| {
            PipelineError::storage(format!("Malformed vocabulary '{}'", path.display()), e)
        })?;
        Vocabulary::from_tokens(tokens)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;

    fn corpus() -> Vec<Token> {
        ["G4", "Rest", "C4.E4.G4", "G4", "E-4"]
            .iter()
            .map(|t| Token::from(*t))
            .collect()
    }

    #[test]
    fn test_written_then_loaded_keeps_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = VocabularyStore::new(dir.path());
        let vocab = Vocabulary::build(&corpus()).unwrap();

        fs::write(store.path(), VocabularyStore::to_json(&vocab).unwrap()).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.tokens(), vocab.tokens());
        for token in corpus() {
            assert_eq!(loaded.encode(&token).unwrap(), vocab.encode(&token).unwrap());
        }
        assert_eq!(loaded.fingerprint(), vocab.fingerprint());
    }

    #[test]
    fn test_missing_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = VocabularyStore::new(dir.path()).load().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_unsorted_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = VocabularyStore::new(dir.path());
        fs::write(store.path(), r#"["Rest", "C4"]"#).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, PipelineError::VocabularyMismatch(_)));
    }
}
