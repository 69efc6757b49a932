//! folio CLI — turn directories of plain-text files into one navigable PDF.
//!
//! Each input file becomes a chapter with semantically segmented
//! paragraphs, a linked table of contents, and footer back-links.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
