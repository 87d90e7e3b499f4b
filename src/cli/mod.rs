// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    — trains the LSTM on the token corpus
//   2. `generate` — samples a piece from the checkpoint
//   3. `render`   — turns a saved token list into MIDI
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GenerateArgs, RenderArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "bardic-inspiration",
    version = "0.1.0",
    about = "Train an LSTM on note/chord tokens, then generate new music from it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Generate(args) => run_generate(args),
            Commands::Render(args) => run_render(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on corpus: {}", args.corpus);
    let result = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete after {} epochs. Kept epoch {} (loss {:.4}); checkpoint at {}",
        result.losses.len(),
        result.record.epoch + 1,
        result.record.loss,
        result.weights_path.display()
    );
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let piece = GenerateUseCase::new(args.into()).execute()?;

    println!(
        "Generated {} tokens (seed {}).\nTokens: {}\nMIDI:   {}",
        piece.tokens.len(),
        piece.seed,
        piece.tokens_path.display(),
        piece.midi_path.display()
    );
    Ok(())
}

fn run_render(args: RenderArgs) -> Result<()> {
    use crate::application::render_use_case::RenderUseCase;

    let summary = RenderUseCase::new(&args.tokens, &args.output).execute()?;
    println!(
        "Rendered {} events ({} skipped) to {}",
        summary.events, summary.skipped, args.output
    );
    Ok(())
}
