//! SWAN Gallery CLI: notebook galleries for static documentation sites.
//!
//! Renders the notebooks linked from documentation pages, ships their
//! downloads and previews, and turns the link lists into gallery cards.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
