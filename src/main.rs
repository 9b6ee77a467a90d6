//! bndx CLI — bnd workspace dependency explorer.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bndx",
    version,
    about = "Explore relationships between projects in a bnd workspace and their corresponding projects in an Eclipse workspace"
)]
struct Cli {
    /// Location of the bnd workspace
    #[arg(short = 'b', long, default_value = ".")]
    bnd_workspace: PathBuf,

    /// Location of the Eclipse workspace
    #[arg(short = 'e', long, default_value = "../../eclipse")]
    eclipse_workspace: PathBuf,

    #[command(subcommand)]
    command: bndx::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = bndx::cli::dispatch(&cli.bnd_workspace, &cli.eclipse_workspace, cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
