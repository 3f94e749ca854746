//! Protome CLI
//!
//! Operator surface for the translation engine:
//! - Listing the message types a schema registers
//! - Encoding JSON documents (optionally gRPC-framed)
//! - Generating sample JSON for a message type
//! - Dry-running the sentinel-header request rewrite

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use protome_core::{CompilerBackend, DependencyPolicy, EngineConfig, LoadReport, Translator};

mod logging;
mod rewrite;

#[derive(Parser)]
#[command(name = "protome")]
#[command(
    author,
    version,
    about = "Protome: JSON → protobuf wire bytes from .proto files, no codegen"
)]
struct Cli {
    /// More log output (repeat for trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a schema and list every registered message type.
    Types {
        #[command(flatten)]
        schema: SchemaArgs,
        /// Also list short-name lookup keys.
        #[arg(long)]
        all_keys: bool,
    },

    /// Encode a JSON document as a message type.
    Encode {
        #[command(flatten)]
        schema: SchemaArgs,
        /// Message type (short or fully-qualified name).
        #[arg(short = 't', long = "type")]
        type_name: String,
        /// JSON input file (`-` = stdin).
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
        /// Wrap the message in a gRPC length-prefixed frame.
        #[arg(long)]
        grpc: bool,
        /// Write bytes here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Print lowercase hex instead of raw bytes.
        #[arg(long)]
        hex: bool,
    },

    /// Print a sample JSON document for a message type.
    Template {
        #[command(flatten)]
        schema: SchemaArgs,
        /// Message type (short or fully-qualified name).
        #[arg(short = 't', long = "type")]
        type_name: String,
    },

    /// Apply the sentinel-header rewrite to a request described as JSON.
    ///
    /// The request file holds `{"method", "uri", "headers": [[name, value]...], "body"}`.
    Rewrite {
        #[command(flatten)]
        schema: SchemaArgs,
        /// Request description (JSON).
        #[arg(short, long)]
        request: PathBuf,
    },
}

/// Where the schema comes from and how to load it.
#[derive(Args, Debug, Clone)]
struct SchemaArgs {
    /// Root `.proto` file; imports resolve relative to its directory.
    #[arg(required_unless_present = "descriptor_set")]
    schema: Option<PathBuf>,
    /// Use a pre-built `FileDescriptorSet` instead of compiling.
    #[arg(long, conflicts_with = "schema")]
    descriptor_set: Option<PathBuf>,
    /// JSON config file (see `EngineConfig`).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Compiler executable (default: `$PROTOME_PROTOC`, `$PROTOC`, then `protoc`).
    #[arg(long)]
    protoc: Option<PathBuf>,
    /// Compile with `buf build` instead of `protoc`.
    #[arg(long)]
    buf: bool,
    /// Extra import directories (repeatable).
    #[arg(short = 'I', long = "include")]
    include: Vec<PathBuf>,
    /// Fail the load on any unresolved import.
    #[arg(long)]
    strict_deps: bool,
    /// Kill the compiler after this many seconds.
    #[arg(long)]
    compiler_timeout_secs: Option<u64>,
}

impl SchemaArgs {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };
        if self.buf {
            config.compiler.backend = CompilerBackend::Buf;
        }
        if let Some(program) = &self.protoc {
            config.compiler.program = Some(program.clone());
        }
        config.apply_env();
        config.compiler.include_paths.extend(self.include.iter().cloned());
        if self.strict_deps {
            config.dependency_policy = DependencyPolicy::Strict;
        }
        if let Some(secs) = self.compiler_timeout_secs {
            config.compiler.timeout_secs = Some(secs);
        }
        Ok(config)
    }

    /// Build a translator and perform the initial load.
    fn load(&self) -> Result<(Translator, LoadReport)> {
        let translator = Translator::new(self.engine_config()?);
        let report = match (&self.descriptor_set, &self.schema) {
            (Some(path), _) => {
                let bytes = fs::read(path)
                    .with_context(|| format!("failed to read descriptor set: {}", path.display()))?;
                translator.load_descriptor_set(&bytes)?
            }
            (None, Some(schema)) => translator.load_schema(schema)?,
            (None, None) => return Err(anyhow!("a schema file or --descriptor-set is required")),
        };
        Ok((translator, report))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Types { schema, all_keys } => cmd_types(&schema, all_keys),
        Commands::Encode {
            schema,
            type_name,
            input,
            grpc,
            out,
            hex,
        } => cmd_encode(&schema, &type_name, &input, grpc, out.as_ref(), hex),
        Commands::Template { schema, type_name } => cmd_template(&schema, &type_name),
        Commands::Rewrite { schema, request } => rewrite::cmd_rewrite(&schema, &request),
    }
}

fn cmd_types(schema: &SchemaArgs, all_keys: bool) -> Result<()> {
    let (translator, report) = schema.load()?;
    print_report(&report);

    let registry = translator
        .registry()
        .ok_or_else(|| anyhow!("no registry after a successful load"))?;
    if all_keys {
        for name in registry.names() {
            println!("{name}");
        }
    } else {
        for name in registry.full_names() {
            println!("{name}");
        }
    }
    Ok(())
}

fn cmd_encode(
    schema: &SchemaArgs,
    type_name: &str,
    input: &PathBuf,
    grpc: bool,
    out: Option<&PathBuf>,
    as_hex: bool,
) -> Result<()> {
    let (translator, report) = schema.load()?;
    print_report(&report);

    let json = read_input(input)?;
    let translation = translator.translate(&json, type_name, grpc)?;

    if translation.is_empty_message() {
        eprintln!(
            "{} resulting message is empty (0 bytes); check JSON key spelling",
            "WARNING:".yellow().bold()
        );
    }
    eprintln!(
        "  {} {} {} bytes{}",
        "→".cyan(),
        type_name,
        translation.payload.len(),
        if translation.framed { " (gRPC framed)" } else { "" }
    );

    match out {
        Some(path) => {
            let bytes = if as_hex {
                hex::encode(&translation.payload).into_bytes()
            } else {
                translation.payload.to_vec()
            };
            fs::write(path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("  {} {}", "→".cyan(), path.display());
        }
        None if as_hex => println!("{}", hex::encode(&translation.payload)),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&translation.payload)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn cmd_template(schema: &SchemaArgs, type_name: &str) -> Result<()> {
    let (translator, report) = schema.load()?;
    print_report(&report);

    let value = translator.template(type_name)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub(crate) fn print_report(report: &LoadReport) {
    eprintln!("{} {}", "Loaded".green().bold(), report.source);
    eprintln!(
        "  files={} messages={} lookup_keys={}",
        report.files, report.messages, report.keys
    );
    for warning in &report.warnings {
        eprintln!("  {} {warning}", "WARNING:".yellow().bold());
    }
    if !report.compiler_output.trim().is_empty() {
        eprintln!("--- compiler output ---\n{}", report.compiler_output.trim_end());
    }
}

fn read_input(input: &PathBuf) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read JSON from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
}
