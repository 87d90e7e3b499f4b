// ============================================================
// Layer 4 — Windowed Dataset
// ============================================================
// Slides a W-token window over the encoded corpus. Window i is
// tokens i..i+W; its target is token i+W, so a corpus of N tokens
// gives exactly N − W windows.
//
// Length checks run before any allocation: the vocabulary and the
// windows are only built once the corpus is known to be long enough.

use crate::data::vocabulary::Vocabulary;
use crate::domain::error::PipelineError;
use crate::domain::token::Token;
use crate::domain::window::Window;

/// Number of tokens the model sees before predicting the next one.
pub const WINDOW_LENGTH: usize = 100;

/// Every W-token slice of the corpus paired with the token after it.
///
/// Inputs are scaled by the vocabulary size at build time; that same
/// divisor is carried here so generation scales its state identically.
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    windows: Vec<Window>,
    window_length: usize,
    vocab_size: usize,
    vocab_fingerprint: String,
}

/// W must be at least 1 and the corpus must hold more than W tokens.
fn check_length(tokens: usize, window_length: usize) -> Result<(), PipelineError> {
    if window_length == 0 {
        return Err(PipelineError::ZeroWindow);
    }
    if tokens <= window_length {
        return Err(PipelineError::InsufficientData {
            tokens,
            window_length,
        });
    }
    Ok(())
}

/// Build the vocabulary of `corpus` and the dataset encoded with it.
pub fn build_dataset(
    corpus: &[Token],
    window_length: usize,
) -> Result<(Vocabulary, WindowedDataset), PipelineError> {
    if corpus.is_empty() {
        return Err(PipelineError::EmptyCorpus);
    }
    check_length(corpus.len(), window_length)?;
    let vocabulary = Vocabulary::build(corpus)?;
    let dataset = WindowedDataset::from_corpus(corpus, &vocabulary, window_length)?;
    Ok((vocabulary, dataset))
}

impl WindowedDataset {
    /// Slice an already-built vocabulary's corpus into windows.
    ///
    /// Fails before allocating anything when W is zero or the corpus is
    /// not longer than one window, and on any token the vocabulary does
    /// not know.
    pub fn from_corpus(
        corpus: &[Token],
        vocabulary: &Vocabulary,
        window_length: usize,
    ) -> Result<Self, PipelineError> {
        check_length(corpus.len(), window_length)?;

        let ids = vocabulary.encode_all(corpus)?;
        let windows: Vec<Window> = (0..ids.len() - window_length)
            .map(|i| Window::new(ids[i..i + window_length].to_vec(), ids[i + window_length]))
            .collect();

        tracing::debug!(
            "Built {} windows of length {} over {} tokens",
            windows.len(),
            window_length,
            corpus.len()
        );

        Ok(Self {
            windows,
            window_length,
            vocab_size: vocabulary.len(),
            vocab_fingerprint: vocabulary.fingerprint(),
        })
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn window(&self, index: usize) -> Option<&Window> {
        self.windows.get(index)
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// V at build time. Also the number of target classes.
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Fingerprint of the vocabulary the ids were encoded with.
    pub fn vocab_fingerprint(&self) -> &str {
        &self.vocab_fingerprint
    }

    /// What every input id is divided by.
    pub fn divisor(&self) -> f32 {
        self.vocab_size as f32
    }

    pub fn scaled_input(&self, index: usize) -> Option<Vec<f32>> {
        self.window(index).map(|w| w.scaled_input(self.divisor()))
    }

    pub fn one_hot_target(&self, index: usize) -> Option<Vec<f32>> {
        self.window(index).map(|w| w.one_hot_target(self.vocab_size))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Never true for a dataset built by `from_corpus`.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn cycling(len: usize) -> Vec<Token> {
        ["C", "D", "E", "F"]
            .iter()
            .cycle()
            .take(len)
            .map(|n| Token::from(*n))
            .collect()
    }

    #[test]
    fn test_cycling_corpus_gives_n_minus_w_windows() {
        let (vocab, dataset) = build_dataset(&cycling(240), WINDOW_LENGTH).unwrap();
        assert_eq!(vocab.len(), 4);
        assert_eq!(dataset.len(), 140);
        assert_eq!(dataset.window_length(), 100);

        for i in 0..dataset.len() {
            let input = dataset.scaled_input(i).unwrap();
            assert_eq!(input.len(), 100);
            assert!(input.iter().all(|v| (0.0..1.0).contains(v)));
        }
    }

    #[test]
    fn test_targets_are_the_following_token() {
        let corpus = cycling(240);
        let (vocab, dataset) = build_dataset(&corpus, WINDOW_LENGTH).unwrap();
        for (i, w) in dataset.windows().iter().enumerate() {
            assert_eq!(w.input.len(), WINDOW_LENGTH);
            assert!((w.target as usize) < vocab.len());
            assert_eq!(vocab.decode(w.target), Some(&corpus[i + WINDOW_LENGTH]));
            assert_eq!(vocab.decode(w.input[0]), Some(&corpus[i]));
        }
    }

    #[test]
    fn test_one_hot_targets() {
        let (_, dataset) = build_dataset(&cycling(240), WINDOW_LENGTH).unwrap();
        let row = dataset.one_hot_target(0).unwrap();
        assert_eq!(row.len(), 4);
        assert_eq!(row.iter().sum::<f32>(), 1.0);
        // window 0 is followed by corpus[100] = "C" (id 0)
        assert_eq!(row[0], 1.0);
    }

    #[test]
    fn test_window_count_for_various_lengths() {
        for (n, w) in [(5, 2), (11, 10), (30, 1), (240, 100)] {
            let (_, dataset) = build_dataset(&cycling(n), w).unwrap();
            assert_eq!(dataset.len(), n - w);
        }
    }

    #[test]
    fn test_short_corpus_is_insufficient() {
        let corpus: Vec<Token> = ["C", "D", "E", "F"].iter().map(|n| Token::from(*n)).collect();
        let err = build_dataset(&corpus, WINDOW_LENGTH).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData {
                tokens: 4,
                window_length: 100
            }
        ));
    }

    #[test]
    fn test_corpus_equal_to_window_is_insufficient() {
        assert!(matches!(
            build_dataset(&cycling(100), WINDOW_LENGTH),
            Err(PipelineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_zero_window_is_rejected() {
        assert!(matches!(
            build_dataset(&cycling(20), 0),
            Err(PipelineError::ZeroWindow)
        ));
        let vocab = Vocabulary::build(&cycling(20)).unwrap();
        assert!(matches!(
            WindowedDataset::from_corpus(&cycling(20), &vocab, 0),
            Err(PipelineError::ZeroWindow)
        ));
    }

    #[test]
    fn test_length_is_checked_before_the_vocabulary() {
        // reported before any vocabulary is built
        assert!(matches!(
            build_dataset(&cycling(3), 3),
            Err(PipelineError::InsufficientData {
                tokens: 3,
                window_length: 3
            })
        ));
        assert!(matches!(
            build_dataset(&[], 4),
            Err(PipelineError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_dataset_carries_the_vocabulary_fingerprint() {
        let (vocab, dataset) = build_dataset(&cycling(30), 4).unwrap();
        assert_eq!(dataset.vocab_fingerprint(), vocab.fingerprint());
    }

    #[test]
    fn test_unknown_token_against_foreign_vocabulary() {
        let vocab = Vocabulary::build(&[Token::from("C")]).unwrap();
        let err = WindowedDataset::from_corpus(&cycling(20), &vocab, 4).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownToken(_)));
    }
}
