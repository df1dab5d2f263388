use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_yaml::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lamina::ConfigStore;
use lamina::loader::default_config_dir;

#[derive(Parser)]
#[command(name = "lamina")]
#[command(
	author,
	version,
	about = "Layered YAML configuration store with overrides and inheritance"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Directory holding <name>.yaml and <name>.local.yaml documents
	#[arg(long, global = true, env = "LAMINA_CONFIG_DIR", value_name = "DIR")]
	config_dir: Option<PathBuf>,

	/// Stage a runtime override before loading, e.g. database/port=5433
	#[arg(long = "set", global = true, value_name = "DOC/PATH=VALUE")]
	overrides: Vec<String>,

	/// Enable debug logging
	#[arg(short, long, global = true)]
	verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Print a merged, resolved document as YAML
	Show { name: String },
	/// Print the value at a slash-delimited path inside a document
	Get { name: String, path: String },
	/// Load documents and report advisories; fails if any were raised
	Check {
		#[arg(required = true)]
		names: Vec<String>,
	},
	/// Copy a document's merged content into another document and save it
	Copy { from: String, to: String },
}

fn main() -> ExitCode {
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	let config_dir = match cli.config_dir {
		Some(dir) => dir,
		None => default_config_dir().context("No --config-dir given")?,
	};
	let mut store = ConfigStore::new(config_dir);
	apply_overrides(&mut store, &cli.overrides)?;

	match cli.command {
		Commands::Show { name } => handle_show(&mut store, &name),
		Commands::Get { name, path } => handle_get(&mut store, &name, &path),
		Commands::Check { names } => handle_check(&mut store, &names),
		Commands::Copy { from, to } => handle_copy(&mut store, &from, &to),
	}
}

// RUST_LOG, when set, replaces the default level; --verbose raises that default
// from WARN to DEBUG.
fn init_tracing(verbose: bool) {
	let level = if verbose { Level::DEBUG } else { Level::WARN };
	let filter = EnvFilter::builder()
		.with_default_directive(level.into())
		.from_env_lossy();
	let _ = tracing_subscriber::registry()
		.with(fmt::layer().with_writer(std::io::stderr))
		.with(filter)
		.try_init();
}

fn apply_overrides(store: &mut ConfigStore, overrides: &[String]) -> Result<()> {
	for raw in overrides {
		let (path, value) = raw
			.split_once('=')
			.with_context(|| format!("Override must look like DOC/PATH=VALUE: {raw}"))?;
		store
			.runtime_mut()
			.set(path, parse_value(value))
			.with_context(|| format!("Invalid override: {raw}"))?;
	}
	Ok(())
}

/// Override values are YAML scalars; anything unparsable is kept as a string.
fn parse_value(raw: &str) -> Value {
	serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn handle_show(store: &mut ConfigStore, name: &str) -> Result<ExitCode> {
	let document = store
		.get(name)
		.with_context(|| format!("Failed to load {name}"))?;
	let text = serde_yaml::to_string(&document.to_mapping())
		.with_context(|| format!("Failed to render {name}"))?;
	print!("{text}");
	Ok(ExitCode::SUCCESS)
}

fn handle_get(store: &mut ConfigStore, name: &str, path: &str) -> Result<ExitCode> {
	let document = store
		.get(name)
		.with_context(|| format!("Failed to load {name}"))?;
	let value = document
		.lookup(path)
		.with_context(|| format!("{path} not found in {name}"))?;

	match value {
		Value::String(text) => println!("{text}"),
		other => print!(
			"{}",
			serde_yaml::to_string(&other).context("Failed to render value")?
		),
	}
	Ok(ExitCode::SUCCESS)
}

fn handle_check(store: &mut ConfigStore, names: &[String]) -> Result<ExitCode> {
	for name in names {
		store
			.get(name)
			.with_context(|| format!("Failed to load {name}"))?;
	}

	let advisories = store.take_advisories();
	if advisories.is_empty() {
		println!("All documents loaded cleanly:");
		for name in names {
			println!("  {name}");
		}
		return Ok(ExitCode::SUCCESS);
	}

	println!("{} advisories raised:", advisories.len());
	for advisory in &advisories {
		println!("  {advisory}");
	}
	Ok(ExitCode::FAILURE)
}

fn handle_copy(store: &mut ConfigStore, from: &str, to: &str) -> Result<ExitCode> {
	let source = store
		.get(from)
		.with_context(|| format!("Failed to load {from}"))?;
	store
		.set(to, source.to_mapping())
		.with_context(|| format!("Failed to load {to}"))?;
	let path = store
		.save(to)
		.with_context(|| format!("Failed to save {to}"))?;

	println!("Saved {to} to {}", path.display());
	Ok(ExitCode::SUCCESS)
}
