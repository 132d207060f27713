// EmuGen - Emulator Configuration Code Generator
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::Parser;
use emugen_codegen::Emitter;
use emugen_config::{AttrMap, ClassDef, Resolver};
use emugen_hierarchy::Hierarchy;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_OUTPUT_ERROR: u8 = 3;

/// Name of the structural description file inside the configuration
/// directory.
const LAYER_FILE: &str = "layer.xml";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Generate C++ initialization source from emulator configuration"
)]
struct Cli {
    /// Directory holding configuration sources and layer.xml; generated
    /// files are written to its obj/ subdirectory
    #[arg(short, long, default_value = ".")]
    config_dir: PathBuf,

    /// Primary configuration file, always included in the model
    #[arg(long, default_value = "configs/params.py")]
    primary: PathBuf,

    /// Root of the C++ include tree searched by the fallback emission pass
    #[arg(long, default_value = "inc")]
    include_dir: PathBuf,

    /// Write the resolved configuration model as JSON to the given path
    #[arg(long)]
    dump_model: Option<PathBuf>,

    /// Enable debug-level diagnostics
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    run(cli)
}

fn run(cli: Cli) -> ExitCode {
    let model = match emugen_config::load_model(&cli.config_dir, &cli.primary) {
        Ok(model) => model,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    info!(classes = model.len(), "configuration model loaded");

    let mut resolver = Resolver::new(&model);
    let resolved = match resolver.resolve_all() {
        Ok(resolved) => resolved,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let hierarchy = match Hierarchy::from_file(&cli.config_dir.join(LAYER_FILE)) {
        Ok(hierarchy) => hierarchy,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    info!(cpu = hierarchy.cpu(), parents = hierarchy.len(), "hierarchy loaded");

    if let Some(path) = &cli.dump_model {
        if let Err(e) = dump_model(path, &model, &resolved) {
            error!("{e:#}");
            return ExitCode::from(EXIT_OUTPUT_ERROR);
        }
    }

    let emitter = Emitter::new(cli.config_dir.join("obj"), &cli.include_dir);
    match emitter.emit(&model, &resolved, hierarchy) {
        Ok(files) => {
            info!(files = files.len(), "generation complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(EXIT_OUTPUT_ERROR)
        }
    }
}

#[derive(serde::Serialize)]
struct ModelDump<'a> {
    classes: &'a [ClassDef],
    resolved: &'a IndexMap<String, AttrMap>,
}

fn dump_model(
    path: &Path,
    classes: &[ClassDef],
    resolved: &IndexMap<String, AttrMap>,
) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create model dump at {}", path.display()))?;
    serde_json::to_writer_pretty(file, &ModelDump { classes, resolved })
        .context("failed to serialize model dump")?;
    Ok(())
}
