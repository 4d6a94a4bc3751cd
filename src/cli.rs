//! Command line: generate | check | print | schema | list
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;

use crate::codegen;
use crate::job::{Freshness, GenerationJob, run_jobs};
use crate::registry::Registry;
use crate::schema::FamilySpec;

const DEFAULT_OUT_DIR: &str = "src/main/java/hvu/jfox";
const DEFAULT_PACKAGE: &str = "hvu.jfox";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate visitor-pattern AST class hierarchies from the built-in node schema
#[derive(Parser, Debug)]
#[command(name = "astgen", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// write one source file per family, replacing previous output
    Generate(GenerateOut),
    /// exit non-zero if any generated file on disk is stale or missing
    Check(CheckOut),
    /// print a single family's source to stdout
    Print(PrintOut),
    /// print the registry as JSON (debug view)
    Schema(SchemaOut),
    /// list families and their variants
    List,
}

#[derive(Args, Debug, Clone)]
struct TargetSettings {
    /// package declared by generated sources (empty for the default package)
    #[arg(long, default_value = DEFAULT_PACKAGE)]
    package: String,

    /// restrict to these families; every family when omitted
    #[arg(long = "family", short)]
    families: Vec<String>,

    /// directory receiving `<Base>.java` files
    #[arg(long, short, default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    settings: TargetSettings,

    /// create the output directory if it does not exist
    #[arg(long)]
    mkdir: bool,

    /// print the planned jobs without writing anything
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    settings: TargetSettings,
}

#[derive(clap::Parser, Debug)]
struct PrintOut {
    /// family base name, e.g. Expr
    #[arg(long, short)]
    family: String,

    /// package declared by the printed source
    #[arg(long, default_value = DEFAULT_PACKAGE)]
    package: String,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TargetSettings {
    fn plan(&self, registry: &Registry) -> Result<Vec<GenerationJob>> {
        GenerationJob::plan(registry, &self.out_dir, &self.package, &self.families)
            .context("invalid node schema")
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        let registry = Registry::builtin();
        match &self.cmd {
            Command::Generate(target) => {
                let jobs = target.settings.plan(&registry)?;
                if target.no_op {
                    for job in &jobs {
                        eprintln!("{} {}", "would write".yellow(), job.destination.display());
                    }
                    return Ok(());
                }
                let written = run_jobs(&jobs, target.mkdir).context("generation aborted")?;
                for path in written {
                    eprintln!("{} {}", "wrote".green().bold(), path.display());
                }
            }
            Command::Check(target) => {
                let jobs = target.settings.plan(&registry)?;
                let mut outdated = 0usize;
                for job in &jobs {
                    let status = job.check()?;
                    let label = match status {
                        Freshness::Fresh => "fresh".green(),
                        Freshness::Stale => "stale".red().bold(),
                        Freshness::Missing => "missing".red().bold(),
                    };
                    eprintln!("{label} {}", job.destination.display());
                    if status != Freshness::Fresh {
                        outdated += 1;
                    }
                }
                if outdated > 0 {
                    bail!("{outdated} generated file(s) out of date; rerun `astgen generate`");
                }
            }
            Command::Print(target) => {
                registry.validate().context("invalid node schema")?;
                let resolved = registry.resolve()?;
                let family = resolved.require(&target.family)?;
                let source = codegen::emit(family, &target.package)?;
                print!("{source}");
            }
            Command::Schema(target) => {
                let view = registry
                    .families()
                    .map(|family| (family.base_name.as_str(), family))
                    .collect::<IndexMap<&str, &FamilySpec>>();
                let schema_src = serde_json::to_string_pretty(&view)?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)
                            .with_context(|| format!("creating {}", parent.display()))?;
                    }
                    std::fs::write(out, &schema_src)
                        .with_context(|| format!("writing {}", out.display()))?;
                } else {
                    println!("{schema_src}");
                }
            }
            Command::List => {
                if registry.is_empty() {
                    println!("no families registered");
                    return Ok(());
                }
                let names = registry.names().collect::<Vec<_>>().join(", ");
                println!("{} {} ({names})", registry.len(), "families".bold());
                for family in registry.families() {
                    println!("{}", family.base_name.bold());
                    for variant in family.variants.values() {
                        println!("  {}({})", variant.name.cyan(), describe_fields(variant));
                    }
                }
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn describe_fields(variant: &crate::schema::VariantSpec) -> String {
    variant
        .fields
        .iter()
        .map(|f| format!("{} {}", f.ty, f.name))
        .collect::<Vec<_>>()
        .join(", ")
}
