//! cimgraph CLI
//!
//! Loads a vocabulary distribution directory and prints:
//! - the selected fragment files or the merged JSON-LD document
//! - the nodes of one type, framed with the shared context
//! - exploration output (statement total, element types, model size, classes)
//! - the tabular regeneration extracts, or any single named report

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cimgraph_factdb::FactGraph;
use cimgraph_ingest_jsonld::{CimLoader, LoadOptions, Profile};
use cimgraph_reports::{ReportKind, Reports};

#[derive(Parser)]
#[command(name = "cimgraph")]
#[command(
    author,
    version,
    about = "Query and regenerate a JSON-LD vocabulary distribution"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the fragment files the profile selects.
    Files {
        root: PathBuf,
        #[command(flatten)]
        load: LoadArgs,
    },

    /// Print every selected document, with the shared context, under one `@graph`.
    Json {
        root: PathBuf,
        #[command(flatten)]
        load: LoadArgs,
    },

    /// Every node of one type, merged across files and compacted with the
    /// shared context (defaults to the properties of the conceptual model).
    Frame {
        root: PathBuf,
        /// Type to select: a term, prefixed name or IRI.
        #[arg(long = "type", default_value = "rdf:Property")]
        type_name: String,
        #[command(flatten)]
        load: LoadArgs,
    },

    /// Statement total, element types, model size, classes and property domains.
    Explore {
        root: PathBuf,
        #[command(flatten)]
        load: LoadArgs,
    },

    /// The six tab-separated regeneration extracts.
    Regenerate {
        root: PathBuf,
        #[command(flatten)]
        load: LoadArgs,
    },

    /// One named report.
    Report {
        root: PathBuf,
        /// subject-areas, entity-groups, class-concepts, property-concepts,
        /// schemas, schema-properties, classes, table, cardinalities, types,
        /// summary or domains
        name: ReportKind,
        #[command(flatten)]
        load: LoadArgs,
    },

    /// Number of nodes with the given type (a prefixed name, e.g. `cim:SubjectArea`).
    Count {
        root: PathBuf,
        type_name: String,
        #[command(flatten)]
        load: LoadArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct LoadArgs {
    /// Which slice of the distribution to load.
    #[arg(long, value_enum, default_value_t = ProfileArg::All)]
    profile: ProfileArg,

    /// Context document to use instead of `src/context.jsonld` / `context.jsonld`
    /// (relative to ROOT unless absolute).
    #[arg(long)]
    context: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileArg {
    /// Canonical schema shapes
    Schema,
    /// Conceptual summary
    Conceptual,
    /// Both
    All,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Schema => Profile::CanonicalSchema,
            ProfileArg::Conceptual => Profile::Conceptual,
            ProfileArg::All => Profile::ConceptualAndSchema,
        }
    }
}

impl LoadArgs {
    fn loader(&self, root: &Path) -> CimLoader {
        let mut options = LoadOptions::with_profile(self.profile.into());
        if let Some(context) = &self.context {
            options.context_locations = vec![context.clone()];
        }
        CimLoader::with_options(root, options)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Files { root, load } => cmd_files(&root, &load),
        Commands::Json { root, load } => cmd_json(&root, &load),
        Commands::Frame {
            root,
            type_name,
            load,
        } => cmd_frame(&root, &type_name, &load),
        Commands::Explore { root, load } => cmd_explore(&root, &load),
        Commands::Regenerate { root, load } => cmd_regenerate(&root, &load),
        Commands::Report { root, name, load } => cmd_report(&root, name, &load),
        Commands::Count {
            root,
            type_name,
            load,
        } => cmd_count(&root, &type_name, &load),
    }
}

fn load_graph(root: &Path, load: &LoadArgs) -> Result<FactGraph> {
    eprintln!("{} {}", "Loading".green().bold(), root.display());
    let graph = load
        .loader(root)
        .load_graph()
        .with_context(|| format!("failed to load distribution at {}", root.display()))?;
    eprintln!(
        "{} {} statements",
        "Loaded".green().bold(),
        graph.len().to_string().bold()
    );
    Ok(graph)
}

fn cmd_files(root: &Path, load: &LoadArgs) -> Result<()> {
    let files = load.loader(root).schema_files()?;
    for file in &files {
        println!("{}", file.display());
    }
    eprintln!("{} {} files", "Selected".green().bold(), files.len());
    Ok(())
}

fn cmd_json(root: &Path, load: &LoadArgs) -> Result<()> {
    let merged = load.loader(root).merged_document()?;
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}

fn cmd_frame(root: &Path, type_name: &str, load: &LoadArgs) -> Result<()> {
    let framed = load
        .loader(root)
        .frame_by_type(type_name)
        .with_context(|| format!("failed to frame `{type_name}` nodes"))?;
    let count = framed["@graph"].as_array().map_or(0, Vec::len);
    println!("{}", serde_json::to_string_pretty(&framed)?);
    eprintln!("{} {} `{}` nodes", "Framed".green().bold(), count, type_name);
    Ok(())
}

fn cmd_explore(root: &Path, load: &LoadArgs) -> Result<()> {
    let graph = load_graph(root, load)?;
    let reports = Reports::new(&graph);

    println!("Total number of statements in the graph: {}", graph.len());
    println!("Types of elements:");
    println!("{}", reports.list_model_element_types()?);
    println!("{}", reports.model_summary()?);
    println!("{}", reports.list_classes()?);
    println!("{}", reports.property_domains()?);
    Ok(())
}

fn cmd_regenerate(root: &Path, load: &LoadArgs) -> Result<()> {
    let graph = load_graph(root, load)?;
    for (kind, table) in Reports::new(&graph).regenerate()? {
        debug!(report = %kind, bytes = table.len(), "rendered");
        println!("{table}");
    }
    Ok(())
}

fn cmd_report(root: &Path, kind: ReportKind, load: &LoadArgs) -> Result<()> {
    let graph = load_graph(root, load)?;
    let out = Reports::new(&graph)
        .render(kind)
        .with_context(|| format!("report `{kind}` failed"))?;
    print!("{out}");
    Ok(())
}

fn cmd_count(root: &Path, type_name: &str, load: &LoadArgs) -> Result<()> {
    let graph = load_graph(root, load)?;
    let n = Reports::new(&graph)
        .count_of_type(type_name)
        .with_context(|| format!("cannot count `{type_name}`"))?;
    println!("{n}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn report_and_profile_arguments_parse() {
        let cli = Cli::try_parse_from([
            "cimgraph",
            "report",
            "/tmp/cim",
            "schema-properties",
            "--profile",
            "schema",
        ])
        .unwrap();
        let Commands::Report { name, load, .. } = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(name, ReportKind::SchemaProperties);
        assert_eq!(Profile::from(load.profile), Profile::CanonicalSchema);
        assert!(load.context.is_none());

        assert!(Cli::try_parse_from(["cimgraph", "report", "/tmp/cim", "bogus"]).is_err());
    }

    #[test]
    fn frame_defaults_to_properties() {
        let cli = Cli::try_parse_from(["cimgraph", "frame", "/tmp/cim", "--profile", "conceptual"])
            .unwrap();
        let Commands::Frame { type_name, load, .. } = cli.command else {
            panic!("expected frame command");
        };
        assert_eq!(type_name, "rdf:Property");
        assert_eq!(Profile::from(load.profile), Profile::Conceptual);

        let cli = Cli::try_parse_from(["cimgraph", "frame", "/tmp/cim", "--type", "rdfs:Class"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Frame { ref type_name, .. } if type_name == "rdfs:Class"));
    }

    #[test]
    fn context_override_replaces_fallbacks() {
        let load = LoadArgs {
            profile: ProfileArg::All,
            context: Some(PathBuf::from("custom.jsonld")),
        };
        let loader = load.loader(Path::new("/tmp/cim"));
        assert_eq!(loader.options().context_locations, vec![PathBuf::from("custom.jsonld")]);
        assert_eq!(loader.options().profile, Profile::ConceptualAndSchema);
    }
}
