use anyhow::Result;
use clap::Parser;
use diffingo::cli::{self, Args};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    if let Err(err) = cli::run(&args) {
        tracing::error!(%err, "diffingo: compilation failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
