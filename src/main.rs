use anyhow::{Context, Result};
use cinspect::cli::{Cli, Commands, SymbolArgs, SymbolKind};
use cinspect::config::{cinspect_home, resolve_index_path};
use cinspect::download::{download_indexes, prompt_overwrite};
use cinspect::indexer::{Indexer, IndexerOptions};
use cinspect::inspect::{getfile, getsource};
use cinspect::object::{InspectObject, Receiver, RuntimeObject};
use cinspect::reader::Reader;
use cinspect::store::IndexStore;
use clap::Parser;
use std::io::Read;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing(matches!(cli.command, Commands::Index { verbose: true, .. }));

    let index_path = resolve_index_path(cli.index.as_deref())?;

    match cli.command.clone() {
        Commands::Index {
            paths,
            max_errors,
            verbose,
        } => {
            let indexer = Indexer::new(&index_path, IndexerOptions { max_errors, verbose });
            let reports = indexer.index_all(&paths)?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Commands::Source(args) => {
            let reader = Reader::new(&index_path);
            write_output(&reader.get_source(&symbol_object(&args))?);
        }
        Commands::File(args) => {
            let reader = Reader::new(&index_path);
            write_path(&reader.get_file(&symbol_object(&args))?);
        }
        Commands::Inspect { snapshot, file } => {
            let obj = read_snapshot(&snapshot)?;
            if file {
                write_path(&getfile(&obj, Some(index_path.as_path()))?);
            } else {
                write_output(&getsource(&obj, Some(index_path.as_path()))?);
            }
        }
        Commands::Stats => {
            let store = IndexStore::new(&index_path);
            let stats = store.load_existing()?.stats(store.path());
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Download { url, yes } => {
            let target = cinspect_home()?;
            let written = if yes {
                download_indexes(&url, &target, &mut |_| true)?
            } else {
                download_indexes(&url, &target, &mut |p| prompt_overwrite(p))?
            };
            for path in written {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_cli() -> Cli {
    let args: Vec<String> = std::env::args().collect();
    Cli::parse_from(rewrite_args_for_implicit_source(args))
}

/// `cinspect say_hello` is shorthand for `cinspect source say_hello`.
fn rewrite_args_for_implicit_source(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = [
        "index", "source", "file", "inspect", "stats", "download", "help",
    ];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if a == "--index" {
            idx += 2;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "source".to_string());
        }
    }

    args
}

fn symbol_object(args: &SymbolArgs) -> InspectObject {
    let name = args.name.clone();
    match args.kind {
        SymbolKind::Type => InspectObject::Type {
            name,
            module: args.module.clone(),
        },
        SymbolKind::Module => InspectObject::module(name),
        SymbolKind::Function => InspectObject::function(name, args.module.clone()),
        SymbolKind::Method => InspectObject::BuiltinMethod {
            name,
            module: args.module.clone(),
            receiver: args.type_name.clone().map(|class_name| Receiver::Instance { class_name }),
        },
        SymbolKind::Descriptor => InspectObject::MethodDescriptor {
            name,
            owner: args.type_name.clone(),
        },
    }
}

fn read_snapshot(path: &Path) -> Result<RuntimeObject> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snapshot from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?
    };
    serde_json::from_str(&raw).context("Malformed reflection snapshot")
}

/// A soft miss prints nothing.
fn write_output(content: &str) {
    if content.is_empty() {
        return;
    }
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
}

fn write_path(path: &Path) {
    if !path.as_os_str().is_empty() {
        println!("{}", path.display());
    }
}
