use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use fieldtree_compiler::{CompiledSchema, SchemaDocument, compile};
use fieldtree_core::render;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "fieldtree")]
#[command(about = "Check and compile field tree schema documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load and compile a schema document, reporting any errors.
    Check(CheckArgs),
    /// Compile a schema document and write the emitter-facing artifacts.
    Compile(CompileArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Path to the schema document (YAML).
    config: PathBuf,
}

#[derive(Debug, Args)]
struct CompileArgs {
    /// Path to the schema document (YAML).
    config: PathBuf,
    /// Output directory for compiled artifact JSON files.
    #[arg(long)]
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Compile(args) => run_compile(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_and_compile(config: &Path) -> Result<CompiledSchema, String> {
    let document = SchemaDocument::load(config)
        .map_err(|e| format!("failed to load {}: {e}", config.display()))?;
    compile(&document).map_err(|e| format!("failed to compile {}: {e}", config.display()))
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let compiled = load_and_compile(&args.config)?;

    println!("{}: ok", args.config.display());
    println!(
        "  {} fields, {} named types, {} metadata entries",
        compiled.fields.len(),
        compiled.registry.len(),
        compiled.metadata.len()
    );
    for field in &compiled.fields {
        let marker = if field.positional { " (positional)" } else { "" };
        println!("  {} :: {}{marker}", field.joined_path(), render(&field.ty));
    }
    Ok(())
}

fn run_compile(args: CompileArgs) -> Result<(), String> {
    let compiled = load_and_compile(&args.config)?;

    fs::create_dir_all(&args.output)
        .map_err(|e| format!("failed to create {}: {e}", args.output.display()))?;

    write_json(&args.output.join("fields.json"), &compiled.fields)?;
    write_json(&args.output.join("constructors.json"), &compiled.constructors)?;
    write_json(&args.output.join("types.json"), &compiled.declared)?;

    let manifest = serde_json::json!({
        "version": PACKAGE_VERSION,
        "source": args.config.display().to_string(),
        "fields": compiled.fields.len(),
        "named_types": compiled.registry.len(),
        "metadata": compiled.metadata,
    });
    write_json(&args.output.join("manifest.json"), &manifest)?;

    println!(
        "compiled {} fields to {}",
        compiled.fields.len(),
        args.output.display()
    );
    Ok(())
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("failed to serialize {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("failed to write {}: {e}", path.display()))
}
