use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::download::ARCHIVE_URL;

#[derive(Debug, Clone, Parser)]
#[command(name = "cinspect")]
#[command(about = "Look up the C source of built-in functions, methods, types and modules")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_name = "FILE", global = true)]
    pub index: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Index C sources below one or more paths.
    Index {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        #[arg(long, value_name = "N", default_value_t = 0)]
        max_errors: usize,

        #[arg(short = 'v', long)]
        verbose: bool,
    },
    /// Print the source implementing a symbol.
    Source(SymbolArgs),
    /// Print the file implementing a symbol.
    File(SymbolArgs),
    /// Classify a reflection snapshot (JSON, `-` for stdin) and print its source.
    Inspect {
        #[arg(value_name = "JSON")]
        snapshot: PathBuf,

        #[arg(long)]
        file: bool,
    },
    Stats,
    /// Fetch prebuilt indexes into ~/.cinspect.
    Download {
        #[arg(long, value_name = "URL", default_value = ARCHIVE_URL)]
        url: String,

        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct SymbolArgs {
    pub name: String,

    #[arg(short = 'k', long, value_enum, default_value_t = SymbolKind::Function)]
    pub kind: SymbolKind,

    #[arg(short = 'm', long, value_name = "MODULE")]
    pub module: Option<String>,

    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub type_name: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum SymbolKind {
    Type,
    Module,
    Function,
    Method,
    Descriptor,
}
