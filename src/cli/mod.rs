// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Four commands are supported:
//   1. `inspect`    — walks through the data pipeline
//   2. `train`      — trains the character model on a corpus
//   3. `generate`   — continues a prompt from a checkpoint
//   4. `functional` — runs the functional model API demos
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, FunctionalArgs, GenerateArgs, InspectArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "text-rnn-guide",
    version = "0.1.0",
    about = "Train a character-level LSTM and generate text, plus functional model API demos."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Inspect(args)    => run_inspect(args),
            Commands::Train(args)      => run_train(args),
            Commands::Generate(args)   => run_generate(args),
            Commands::Functional(args) => run_functional(args),
        }
    }
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    InspectUseCase::new(args.into()).execute()?;
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let checkpoint_dir = args.checkpoint_dir.clone();
    let report = TrainUseCase::new(args.into()).execute()?;

    match report.final_loss() {
        Some(loss) => println!("Training complete. Final loss {loss:.4}, checkpoints in '{checkpoint_dir}'."),
        None       => println!("No epochs run."),
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let text = GenerateUseCase::new(args.into()).execute()?;
    println!("{text}");
    Ok(())
}

fn run_functional(args: FunctionalArgs) -> Result<()> {
    use crate::application::functional_use_case::FunctionalUseCase;

    let models = FunctionalUseCase::new(args.into()).execute()?;
    tracing::info!("Built {} model(s): {}", models.len(), models.join(", "));
    Ok(())
}
