mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{cache, elevation, features, image, path};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    tracing_subscriber::registry().with(filter).with(stderr).init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Image(args) => image::run(&cli, args),
        Commands::Elevation(args) => elevation::run(&cli, args),
        Commands::Features(args) => features::run(&cli, args),
        Commands::Path(args) => path::run(&cli, args),
        Commands::Cache(args) => cache::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
