use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use native_bridge::{ConfigError, GeneratedUnit, GeneratorOptions, Library, ModelError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Library(#[from] native_bridge::Error),

    #[error("Invalid log filter: {0}")]
    LogFilter(String),

    #[error("{0} declaration(s) could not be generated")]
    Diagnostics(usize),
}

#[derive(Parser)]
#[command(name = "native-bridge")]
#[command(about = "Generate C# interop bindings from a native declaration model")]
struct Cli {
    /// Log filter (e.g. "warn", "native_bridge=debug")
    #[arg(long, global = true, default_value = "warn", env = "NATIVE_BRIDGE_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one C# file per translation unit
    Generate {
        /// Declaration model (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Generator options (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Library name, overriding the one in the options file
        #[arg(short, long)]
        library: Option<String>,

        /// Fail if any declaration was omitted
        #[arg(long)]
        strict: bool,
    },

    /// Report declarations that cannot be generated, without writing output
    Check {
        /// Declaration model (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Generator options (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(filter: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_new(filter).map_err(|e| AppError::LogFilter(e.to_string()))?;
    let layer = fmt::layer()
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .with_writer(io::stderr);
    tracing_subscriber::registry().with(filter).with(layer).init();
    Ok(())
}

fn load_options(config: Option<&Path>) -> Result<GeneratorOptions, AppError> {
    Ok(match config {
        Some(path) => GeneratorOptions::from_file(path)?,
        None => GeneratorOptions::default(),
    })
}

fn report(units: &[GeneratedUnit]) -> usize {
    let mut count = 0;
    for unit in units {
        for diagnostic in &unit.diagnostics {
            eprintln!("{}: {}", unit.name, diagnostic);
            count += 1;
        }
    }
    count
}

fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Generate {
            model,
            config,
            output,
            library,
            strict,
        } => {
            let mut options = load_options(config.as_deref())?;
            if let Some(name) = library {
                options.library_name = name;
            }
            let model = Library::from_file(&model)?;
            let units = native_bridge::generate_source(&model, &options)?;

            std::fs::create_dir_all(&output)?;
            for unit in &units {
                let path = output.join(format!("{}.cs", unit.name));
                std::fs::write(&path, &unit.source)?;
                println!("Wrote {} ({} bytes)", path.display(), unit.source.len());
            }

            let omitted = report(&units);
            if strict && omitted > 0 {
                return Err(AppError::Diagnostics(omitted));
            }
            Ok(())
        }
        Commands::Check { model, config } => {
            let options = load_options(config.as_deref())?;
            let model = Library::from_file(&model)?;
            let units = native_bridge::generate_source(&model, &options)?;
            let omitted = report(&units);
            if omitted > 0 {
                return Err(AppError::Diagnostics(omitted));
            }
            println!("All declarations in {} unit(s) can be generated", units.len());
            Ok(())
        }
    }
}
