#![recursion_limit = "256"]

mod application;
mod cli;
mod data;
mod domain;
mod infra;
mod ml;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use domain::error::PipelineError;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bardic_inspiration=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let result = cli.run();
    if let Err(e) = &result {
        if let Some(pipeline) = e.downcast_ref::<PipelineError>() {
            tracing::error!(kind = ?pipeline.kind(), index = ?pipeline.index(), "{e:#}");
        }
    }
    result
}
