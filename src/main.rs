use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daylight_recipe::sim::daylight::{RecipeConfig, ResultManifest, merge_manifest, summarize};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "daylight-recipe")]
#[command(about = "Compile daylight coefficient recipes into Radiance command scripts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the project directory and command script for a recipe.
    Compile {
        /// Path to the recipe JSON file
        config: PathBuf,

        /// Directory the project folder is created in
        #[arg(short, long, default_value = ".")]
        target: PathBuf,

        /// Leave out the environment header
        #[arg(long)]
        no_header: bool,
    },

    /// Merge the result files of an executed project and summarize them.
    Results {
        /// Path to result/manifest.json of a compiled project
        manifest: PathBuf,

        /// Write the summary to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Compile {
            config,
            target,
            no_header,
        } => compile(&config, &target, no_header),
        Command::Results { manifest, output } => results(&manifest, output.as_deref()),
    }
}

fn compile(config_path: &Path, target: &Path, no_header: bool) -> Result<()> {
    let config = RecipeConfig::read(config_path)
        .with_context(|| format!("couldn't load recipe {}", config_path.display()))?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let name = config.name.clone();
    let header = config.header && !no_header;

    let mut recipe = config.into_recipe(base_dir)?;
    let compiled = recipe.compile(target, &name, header)?;
    info!(
        "{} daylight coefficient stages, {} reused",
        compiled.daylight_coeff_stages().count(),
        compiled.reused_stage_count()
    );
    println!("{}", compiled.script_path.display());
    Ok(())
}

fn results(manifest_path: &Path, output: Option<&Path>) -> Result<()> {
    let manifest = ResultManifest::read(manifest_path)
        .with_context(|| format!("couldn't load manifest {}", manifest_path.display()))?;
    let mut grids = manifest.load_grids()?;
    merge_manifest(&mut grids, &manifest.hoys, &manifest.results)?;

    let summary = serde_json::to_string_pretty(&summarize(&grids))?;
    match output {
        Some(path) => {
            fs::write(path, summary).with_context(|| format!("couldn't write {}", path.display()))?;
            info!("summary written to {}", path.display());
        }
        None => println!("{summary}"),
    }
    Ok(())
}
