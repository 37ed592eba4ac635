//! Schema Export CLI
//!
//! Inspects the `workload.cattle.io/v1` registry: lists and shows schemas,
//! exports the registry as JSON, and projects documents through a schema's
//! pipeline in either direction.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use workload_schemas::workload::{SCHEMAS, VERSION};
use workload_schemas::{Checksum, SchemaConfig};

#[derive(Parser)]
#[command(name = "schema-export")]
#[command(about = "Inspect and export the workload schema registry")]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered schema
    List,

    /// Show one schema's fields and pipeline
    Show {
        /// Schema id (e.g., "podSpec")
        id: String,
    },

    /// Export the whole registry as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Project a JSON document through a schema
    Project {
        /// Schema id
        id: String,
        /// Document to project
        file: PathBuf,
        /// Reconstruct the native shape instead of projecting outward
        #[arg(long)]
        inward: bool,
    },

    /// Print the registry checksum
    Checksum,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SchemaConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let format = config.export.output_format;

    match cli.command {
        Commands::List => {
            println!("📦 {} ({})", VERSION.group_version(), VERSION.path);
            for schema in SCHEMAS.schemas(&VERSION) {
                match &schema.base_type {
                    Some(base) => println!("  {} → {} ({} fields)", schema.id, base, schema.resource_fields.len()),
                    None => println!("  {} ({} fields)", schema.id, schema.resource_fields.len()),
                }
            }
        }

        Commands::Show { id } => {
            let Some(schema) = SCHEMAS.schema(&VERSION, &id) else {
                match closest_schema(&id) {
                    Some(suggestion) => bail!("unknown schema {}, did you mean {}?", id, suggestion),
                    None => bail!("unknown schema {}", id),
                }
            };
            println!("{}", format.render(schema)?);
        }

        Commands::Export { output } => {
            let schemas: Vec<_> = SCHEMAS.schemas(&VERSION).collect();
            let mut export = json!({
                "version": &*VERSION,
                "schemas": schemas,
            });
            if config.export.include_checksum {
                export["checksum"] = Value::String(Checksum::of_version(&SCHEMAS, &VERSION)?.to_string());
            }

            let rendered = format.render(&export)?;
            match output {
                Some(path) => {
                    fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;
                    println!("✅ Exported {} schemas to {:?}", schemas.len(), path);
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Project { id, file, inward } => {
            if SCHEMAS.schema(&VERSION, &id).is_none() {
                bail!("unknown schema {}", id);
            }
            let content = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let mut document = match serde_json::from_str(&content)? {
                Value::Object(map) => map,
                _ => bail!("{} does not hold a JSON object", file.display()),
            };

            if inward {
                SCHEMAS.to_internal(&VERSION, &id, &mut document);
            } else {
                SCHEMAS.from_internal(&VERSION, &id, &mut document);
            }
            println!("{}", format.render(&document)?);
        }

        Commands::Checksum => {
            println!("{}", Checksum::of_version(&SCHEMAS, &VERSION)?);
        }
    }

    Ok(())
}

/// Best fuzzy match among registered schema ids
fn closest_schema(query: &str) -> Option<String> {
    let matcher = SkimMatcherV2::default();
    SCHEMAS
        .schemas(&VERSION)
        .filter_map(|schema| matcher.fuzzy_match(&schema.id, query).map(|score| (score, &schema.id)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, id)| id.clone())
}
