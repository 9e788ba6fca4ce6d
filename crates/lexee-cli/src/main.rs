//! Lexee CLI - list, describe and run formulas

mod logger;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lexee::prelude::*;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lexee")]
#[command(author, version, about = "Sandboxed formula execution engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Engine options file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for random formulas (overrides the options file)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Date used as today, YYYY-MM-DD (overrides the options file)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// List formulas, one per line
    List {
        /// Only list formulas of this category (label or identifier prefix)
        #[arg(short, long)]
        category: Option<String>,

        /// Print the whole catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the schema of a formula as JSON
    Describe {
        /// Formula identifier
        id: String,
    },

    /// Run a formula and print its results as JSON
    Run {
        /// Formula identifier
        id: String,

        /// Variables as a JSON object
        #[arg(long, conflicts_with = "file")]
        vars: Option<String>,

        /// Read variables from a JSON file ("-" for stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Compact output
        #[arg(long)]
        compact: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(logger::level(cli.verbose, cli.quiet));

    let engine = Engine::with_options(load_options(&cli)?);

    match cli.command {
        Commands::List { category, json } => list_formulas(&engine, category.as_deref(), json),
        Commands::Describe { id } => describe(&engine, &id),
        Commands::Run {
            id,
            vars,
            file,
            compact,
        } => run(&engine, &id, vars.as_deref(), file.as_deref(), compact),
    }
}

fn load_options(cli: &Cli) -> Result<EngineOptions> {
    let mut options = match &cli.config {
        Some(path) => EngineOptions::from_json_file(path)
            .with_context(|| format!("Failed to load options from '{}'", path.display()))?,
        None => EngineOptions::default(),
    };
    if let Some(seed) = cli.seed {
        options = options.with_seed(seed);
    }
    if let Some(today) = cli.today {
        options = options.with_today(today);
    }
    Ok(options)
}

fn list_formulas(engine: &Engine, category: Option<&str>, json: bool) -> Result<()> {
    if json {
        return print_json(&engine.catalog(), false);
    }

    let wanted = category.map(str::to_lowercase);
    let mut stdout = io::stdout().lock();
    for schema in engine.schemas() {
        let label = schema.category.label();
        if let Some(wanted) = &wanted {
            if !label.to_lowercase().starts_with(wanted.as_str()) {
                continue;
            }
        }
        writeln!(stdout, "{}\t{}\t{}", schema.id, label, schema.name)
            .context("Failed to write to stdout")?;
    }
    Ok(())
}

fn describe(engine: &Engine, id: &str) -> Result<()> {
    let schema = engine
        .schema(id)
        .with_context(|| format!("Cannot describe '{}'", id))?;
    let json = serde_json::to_value(&schema).context("Failed to serialize schema")?;
    print_json(&json, false)
}

fn run(
    engine: &Engine,
    id: &str,
    vars: Option<&str>,
    file: Option<&Path>,
    compact: bool,
) -> Result<()> {
    let text = match (vars, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) if path == Path::new("-") => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read variables from stdin")?;
            text
        }
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        (None, None) => "{}".to_string(),
    };

    let variables = match serde_json::from_str(&text).context("Variables are not valid JSON")? {
        serde_json::Value::Object(map) => map,
        other => bail!("Variables must be a JSON object, got {}", json_type(&other)),
    };

    let result = engine
        .execute(id, variables)
        .map_err(|err| anyhow::anyhow!("{} ({})", err, err.kind()))
        .with_context(|| format!("Formula '{}' failed", id))?;

    print_json(&serde_json::Value::Object(result), compact)
}

fn print_json(value: &serde_json::Value, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("Failed to serialize output")?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", text).context("Failed to write to stdout")
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
