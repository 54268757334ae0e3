//! Sable - block scoping lowering
//!
//! CLI driver that reads a serialized syntax tree, lowers its
//! block-scoped declarations to function-scoped `var` form, and writes
//! the result back out as source text or as the transformed tree.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sable_ast::{to_source, Ast, NodeId};
use sable_transform::{rewrite_block_scoped_declarations, NullSink, RewriteOptions, UniqueIds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Lower block-scoped declarations
#[derive(Parser, Debug)]
#[command(name = "sable")]
#[command(author, version, about = "Lower block-scoped declarations to function-scoped form")]
struct Cli {
    /// Serialized syntax tree (JSON) to lower
    input: PathBuf,

    /// Write here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Also rewrite function declarations that appear inside blocks
    #[arg(long)]
    lower_functions: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One compilation unit on disk: the node arena plus its script root.
#[derive(Debug, Serialize, Deserialize)]
struct Unit {
    ast: Ast,
    root: NodeId,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let mut unit: Unit = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", cli.input.display()))?;

    let options = RewriteOptions {
        lower_block_scoped_functions: cli.lower_functions,
    };
    let mut uids = UniqueIds::new();
    rewrite_block_scoped_declarations(&mut unit.ast, unit.root, &mut uids, &mut NullSink, &options)?;

    let rendered = match cli.format {
        OutputFormat::Text => to_source(&unit.ast, unit.root),
        OutputFormat::Json => serde_json::to_string_pretty(&unit)?,
    };
    match cli.output {
        Some(path) => fs::write(&path, rendered + "\n")
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}
