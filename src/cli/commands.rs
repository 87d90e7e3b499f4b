// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `generate`, `render`
// and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::generate_use_case::GenerateConfig;
use crate::application::train_use_case::TrainConfig;
use crate::data::dataset::WINDOW_LENGTH;
use crate::ml::generator::STEPS;
use crate::ml::trainer::{EPOCHS, TARGET_LOSS};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the LSTM on a token corpus and keep the best epoch
    Train(TrainArgs),

    /// Sample a new piece from the trained checkpoint
    Generate(GenerateArgs),

    /// Render a saved token list as a MIDI file
    Render(RenderArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON array of note/chord/rest tokens
    #[arg(long, default_value = "data/notes.json")]
    pub corpus: String,

    /// Directory for weights, metadata, vocabulary and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of full passes through the windows
    #[arg(long, default_value_t = EPOCHS)]
    pub epochs: usize,

    /// The kept epoch is the one whose loss is closest to this,
    /// not the one with the lowest loss
    #[arg(long, default_value_t = TARGET_LOSS)]
    pub target_loss: f64,

    /// Tokens of context per training window (at least 1)
    #[arg(long, default_value_t = WINDOW_LENGTH, value_parser = parse_window)]
    pub window: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// RMSProp learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Units in each LSTM layer
    #[arg(long, default_value_t = 512)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 256)]
    pub dense_size: usize,

    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// Seed for the order windows are visited in
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

fn parse_window(s: &str) -> Result<usize, String> {
    let window: usize = s.parse().map_err(|e| format!("{e}"))?;
    if window == 0 {
        return Err("a window needs at least one token".to_string());
    }
    Ok(window)
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus: a.corpus,
            checkpoint_dir: a.checkpoint_dir,
            epochs: a.epochs,
            target_loss: a.target_loss,
            window: a.window,
            batch_size: a.batch_size,
            lr: a.lr,
            hidden_size: a.hidden_size,
            dense_size: a.dense_size,
            dropout: a.dropout,
            seed: a.seed,
        }
    }
}

/// All arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Corpus to draw the opening window from (same as training)
    #[arg(long, default_value = "data/notes.json")]
    pub corpus: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Tokens to generate
    #[arg(long, default_value_t = STEPS)]
    pub steps: usize,

    /// Reproduce an earlier piece; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value = "output")]
    pub output_dir: String,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        GenerateConfig {
            corpus: a.corpus,
            checkpoint_dir: a.checkpoint_dir,
            steps: a.steps,
            seed: a.seed,
            output_dir: a.output_dir,
        }
    }
}

/// All arguments for the `render` command
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// JSON array of tokens, e.g. output/generated_tokens.json
    #[arg(long)]
    pub tokens: String,

    #[arg(long, default_value = "output/output.mid")]
    pub output: String,
}
