// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the token corpus the upstream MIDI parser produced.
//
// The corpus is one JSON array of token strings, in playing
// order, with every part of every parsed file concatenated:
//
//   ["E-4", "Rest", "C4.E4.G4", "G4", ...]
//
// The whole file is read before the vocabulary is built; the
// core never streams or edits it.
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::token::Token;
use crate::domain::traits::CorpusSource;
use crate::infra::atomic::atomic_write;

/// Loads a token corpus from a JSON file.
pub struct CorpusLoader {
    path: PathBuf,
}

impl CorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write `tokens` to the loader's path, replacing any previous corpus.
    #[allow(dead_code)] // the corpus is produced by the upstream parser
    pub fn save(&self, tokens: &[Token]) -> Result<()> {
        let json = serde_json::to_vec(tokens)?;
        atomic_write(&self.path, &json)
            .with_context(|| format!("Cannot write corpus to '{}'", self.path.display()))?;
        tracing::info!("Saved {} tokens to '{}'", tokens.len(), self.path.display());
        Ok(())
    }
}

impl CorpusSource for CorpusLoader {
    fn load_corpus(&self) -> Result<Vec<Token>> {
        let bytes = fs::read(&self.path).with_context(|| {
            format!(
                "Cannot read corpus '{}'. Has the MIDI parser been run?",
                self.path.display()
            )
        })?;

        let tokens: Vec<Token> = serde_json::from_slice(&bytes).with_context(|| {
            format!(
                "Corpus '{}' is not a JSON array of token strings",
                self.path.display()
            )
        })?;

        if tokens.is_empty() {
            tracing::warn!("Corpus '{}' contains no tokens", self.path.display());
        } else {
            tracing::debug!("Loaded {} tokens from '{}'", tokens.len(), self.path.display());
        }
        Ok(tokens)
    }
}
