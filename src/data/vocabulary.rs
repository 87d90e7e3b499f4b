// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// Maps every distinct token in the corpus to an id in 0..V.
//
// Ids are assigned in sorted token order, so the mapping depends
// only on WHICH tokens occur, never on the order they occur in.
// Rebuilding from the same corpus always gives the same ids.
//
// The same vocabulary must be used for training and generation:
// an id only means something relative to the list it came from.
// VocabularyStore (infra) persists the sorted token list next to
// the checkpoint for that reason, and the checkpoint metadata
// carries the list's fingerprint so a swapped file is caught.

use std::collections::{BTreeSet, HashMap};

use sha2::{Digest, Sha256};

use crate::domain::error::PipelineError;
use crate::domain::token::Token;

#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    /// Sparse lookup from token to id
    token_to_id: HashMap<Token, u32>,
    /// Lookup from id to token. A Vec works because ids are contiguous.
    id_to_token: Vec<Token>,
}

impl Vocabulary {
    /// Build the vocabulary of a corpus.
    pub fn build(corpus: &[Token]) -> Result<Self, PipelineError> {
        if corpus.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        let distinct: BTreeSet<&Token> = corpus.iter().collect();
        let vocab = Self::from_sorted(distinct.into_iter().cloned().collect());
        tracing::info!("Size of vocabulary: {}", vocab.len());
        Ok(vocab)
    }

    /// Rebuild from a persisted token list. The list must be exactly
    /// what `build` produces: non-empty, sorted, no duplicates.
    pub fn from_tokens(tokens: Vec<Token>) -> Result<Self, PipelineError> {
        if tokens.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        if let Some(pair) = tokens.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(PipelineError::VocabularyMismatch(format!(
                "stored token list is not strictly sorted at '{}' / '{}'",
                pair[0], pair[1]
            )));
        }
        Ok(Self::from_sorted(tokens))
    }

    fn from_sorted(tokens: Vec<Token>) -> Self {
        let token_to_id = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();
        Self {
            token_to_id,
            id_to_token: tokens,
        }
    }

    pub fn encode(&self, token: &Token) -> Result<u32, PipelineError> {
        self.token_to_id
            .get(token)
            .copied()
            .ok_or_else(|| PipelineError::UnknownToken(token.to_string()))
    }

    pub fn encode_all(&self, tokens: &[Token]) -> Result<Vec<u32>, PipelineError> {
        tokens.iter().map(|t| self.encode(t)).collect()
    }

    pub fn decode(&self, id: u32) -> Option<&Token> {
        self.id_to_token.get(id as usize)
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.token_to_id.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    /// Tokens in id order.
    pub fn tokens(&self) -> &[Token] {
        &self.id_to_token
    }

    /// SHA-256 over the id-ordered token list. Two vocabularies share a
    /// fingerprint only when every id maps to the same token.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for token in &self.id_to_token {
            let bytes = token.as_str().as_bytes();
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        format!("sha256:{:x}", hasher.finalize())
    }
}
