//! Run treestream passes over an ESTree JSON file.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use treestream::opts::{self, Options};
use treestream::passes::{adjust_field_type, all_to_var, complete_subst, hoist_var_decls, make_expr};
use treestream::tree::{consume, json, produce};
use treestream::{verify, Token};

/// Streaming syntax tree rewrites
#[derive(Parser, Debug)]
#[command(name = "treestream", version, about)]
struct Cli {
    /// ESTree JSON input; reads stdin when omitted
    input: Option<PathBuf>,

    /// Passes to run, in order
    #[arg(short, long = "pass", value_enum, value_delimiter = ',')]
    passes: Vec<Pass>,

    /// Pass options as a JSON object (`{"args": {...}, "file": "..."}`)
    #[arg(long)]
    options: Option<String>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    /// Splice substitution markers
    Subst,
    /// Resolve expression/statement markers
    MakeExpr,
    /// Make nodes fit the shape of their fields
    AdjustFields,
    /// Move declarations to the start of their scopes
    HoistVars,
    /// Turn `let`/`const` into `var`
    AllToVar,
    /// Check the stream without changing it
    Verify,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn run_pass(pass: Pass, tokens: Vec<Token>) -> Result<Vec<Token>> {
    debug!(?pass, tokens = tokens.len(), "running pass");
    let out = match pass {
        Pass::Subst => complete_subst(tokens)?,
        Pass::MakeExpr => make_expr(tokens)?,
        Pass::AdjustFields => adjust_field_type(tokens)?,
        Pass::HoistVars => hoist_var_decls(tokens)?,
        Pass::AllToVar => all_to_var(tokens).collect(),
        Pass::Verify => {
            verify(&tokens).context("stream verification failed")?;
            tokens
        }
    };
    Ok(out)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut options = match &cli.options {
        Some(text) => Options::from_json(text).context("invalid --options")?,
        None => Options::new(),
    };
    if options.file.is_none() {
        if let Some(path) = &cli.input {
            options.file = Some(path.display().to_string());
        }
    }

    let text = read_input(cli.input.as_ref())?;
    let tree = json::from_str(&text).context("failed to parse input tree")?;
    info!(passes = cli.passes.len(), "transforming");

    let top = opts::with_options(options, || -> Result<_> {
        let mut tokens = produce(&tree);
        for pass in &cli.passes {
            tokens = run_pass(*pass, tokens)?;
        }
        Ok(consume(tokens).context("failed to rebuild the tree")?.top)
    })?;

    let out = json::to_json(&top);
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&out)?
    } else {
        serde_json::to_string(&out)?
    };
    println!("{}", rendered);
    Ok(())
}
