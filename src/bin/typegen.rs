//! Schema Typegen CLI
//!
//! Generates Rust types (or the declaration model as JSON) from JSON Schema
//! files. A directory input generates every `*.json` file beneath it in one
//! session, so shared `$ref` targets are generated once.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use schema_typegen::codegen::{IdentifierStyle, NameResolver};
use schema_typegen::{
    file_url, GenerationReport, OutputFormat, RecordingSink, RustSink, SchemaStore,
    Session, TypegenConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-typegen")]
#[command(about = "Generate type declarations from JSON Schema")]
struct Cli {
    /// Schema file, or a directory of *.json schemas
    input: PathBuf,

    /// Class name for the root type (single file only; defaults to the file stem)
    #[arg(short, long)]
    class_name: Option<String>,

    /// Package for generated types (dotted, e.g. "model.api")
    #[arg(short, long)]
    package: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file loaded on top of typegen.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Rust,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Rust => OutputFormat::Rust,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref().map(Path::to_string_lossy);
    let mut config = TypegenConfig::load_from(config_path.as_deref()).context("loading configuration")?;
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if let Some(output) = cli.output {
        config.output.path = Some(output);
    }

    let names = NameResolver::new(config.naming.clone());
    let roots = collect_roots(&cli.input, cli.class_name.as_deref(), &names)?;
    if roots.is_empty() {
        bail!("no *.json schemas found under {}", cli.input.display());
    }

    let base_package = cli.package.unwrap_or_else(|| config.generation.default_package.clone());
    let mut session = Session::new(
        SchemaStore::from_filesystem(),
        config.naming.clone(),
        config.generation.clone(),
    );

    for root in &roots {
        let package = join_package(&base_package, &root.subpackage);
        let url = file_url(&root.path)?;
        session.generate(&url, &root.class_name, Some(&package))?;
    }

    let (rendered, report) = match config.output.format {
        OutputFormat::Rust => {
            let mut sink = RustSink::new(config.output.profile.clone());
            let report = session.emit(&mut sink)?;
            (sink.into_source(), report)
        }
        OutputFormat::Json => {
            let mut sink = RecordingSink::new();
            let report = session.emit(&mut sink)?;
            (sink.to_json()?, report)
        }
    };

    write_output(config.output.path.as_deref(), &rendered)?;
    log_report(&report);
    Ok(())
}

struct Root {
    path: PathBuf,
    class_name: String,
    /// Directory segments between the input directory and the file
    subpackage: Vec<String>,
}

fn collect_roots(input: &Path, class_name: Option<&str>, names: &NameResolver) -> anyhow::Result<Vec<Root>> {
    if input.is_file() {
        let class_name = match class_name {
            Some(name) => name.to_string(),
            None => class_name_for(input, names),
        };
        return Ok(vec![Root {
            path: input.to_path_buf(),
            class_name,
            subpackage: Vec::new(),
        }]);
    }

    if !input.is_dir() {
        bail!("input {} does not exist", input.display());
    }
    if class_name.is_some() {
        bail!("--class-name only applies to a single schema file");
    }

    let mut roots = Vec::new();
    for entry in walkdir::WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", input.display()))?;
        let path = entry.path();
        if !path.is_file() || path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let relative = path.strip_prefix(input)?;
        let subpackage = relative
            .parent()
            .map(|dir| {
                dir.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        roots.push(Root {
            path: path.to_path_buf(),
            class_name: class_name_for(path, names),
            subpackage,
        });
    }
    Ok(roots)
}

/// `home-address.schema.json` → `HomeAddress`
fn class_name_for(path: &Path, names: &NameResolver) -> String {
    let file = path.file_name().map(|f| f.to_string_lossy()).unwrap_or_default();
    let stem = file.trim_end_matches(".json").trim_end_matches(".schema");
    names.sanitize(stem, IdentifierStyle::Type)
}

fn join_package(base: &str, segments: &[String]) -> String {
    std::iter::once(base)
        .chain(segments.iter().map(String::as_str))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

fn write_output(path: Option<&Path>, rendered: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "wrote generated output");
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn log_report(report: &GenerationReport) {
    info!(
        roots = report.roots,
        declared = report.declared,
        classes = report.classes,
        enumerations = report.enumerations,
        documents = report.documents,
        degraded = report.degraded,
        "schema-typegen finished"
    );
}
