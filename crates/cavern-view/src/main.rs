use anyhow::Result;
use clap::Parser;

mod cli;
mod headless;

fn main() -> Result<()> {
    init_tracing();
    let args = cli::CliArgs::parse();
    match args.command {
        cli::Command::Render(args) => headless::render(args),
        cli::Command::Probe(args) => headless::probe(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
