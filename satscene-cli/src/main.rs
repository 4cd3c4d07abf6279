//! satscene CLI - Inspect reader bindings and product dependencies
//!
//! This binary exposes the binding and resolution steps of the satscene
//! library so reader configurations can be checked without a reader plugin.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use satscene::SceneConfig;
use tracing_subscriber::EnvFilter;

use commands::{bind, discover, resolve};

#[derive(Debug, Parser)]
#[command(name = "satscene", version, about = "Satellite scene binding and product resolution")]
struct Cli {
    /// Directory holding satscene.cfg and the reader configurations
    /// (defaults to $SATSCENE_CONFIG_DIR, then the current directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Match files against the reader configurations
    Bind(bind::BindArgs),

    /// Discover a sensor's files on disk for a time window
    Discover(discover::DiscoverArgs),

    /// Expand product names into the raw bands a reader must load
    Resolve(resolve::ResolveArgs),
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match cli.config_dir {
        Some(dir) => SceneConfig::new(dir),
        None => SceneConfig::from_env(),
    };

    let result = match cli.command {
        Commands::Bind(args) => bind::run(&config, args),
        Commands::Discover(args) => discover::run(&config, args),
        Commands::Resolve(args) => resolve::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}
