// ============================================================
// Layer 2 — RenderUseCase
// ============================================================
// Re-renders a saved token list (e.g. generated_tokens.json)
// as a MIDI file, without touching the model.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::token::Token;
use crate::infra::midi_writer::{write_midi, RenderSummary};

pub struct RenderUseCase {
    tokens: PathBuf,
    output: PathBuf,
}

impl RenderUseCase {
    pub fn new(tokens: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            tokens: tokens.into(),
            output: output.into(),
        }
    }

    pub fn execute(&self) -> Result<RenderSummary> {
        let bytes = fs::read(&self.tokens)
            .with_context(|| format!("Cannot read tokens from '{}'", self.tokens.display()))?;
        let tokens: Vec<Token> = serde_json::from_slice(&bytes).with_context(|| {
            format!("'{}' is not a JSON array of tokens", self.tokens.display())
        })?;
        write_midi(&tokens, &self.output)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = dir.path().join("tokens.json");
        fs::write(&tokens, r#"["C4", "Rest", "C4.E4.G4", "nonsense"]"#).unwrap();
        let output = dir.path().join("piece.mid");

        let summary = RenderUseCase::new(&tokens, &output).execute().unwrap();
        assert_eq!(summary.events, 3);
        assert_eq!(summary.skipped, 1);
        assert!(output.is_file());
    }

    #[test]
    fn test_malformed_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = dir.path().join("tokens.json");
        fs::write(&tokens, "{\"not\": \"a list\"}").unwrap();

        let result = RenderUseCase::new(&tokens, dir.path().join("piece.mid")).execute();
        assert!(result.is_err());
    }
}
