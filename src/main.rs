use anyhow::{Context, Result};
use clap::Parser;
use shadergen::cli::Cli;
use shadergen::orchestrator::BuildOrchestrator;

fn run(cli: &Cli) -> Result<()> {
    let config = cli.to_config().context("Failed to load configuration")?;

    // CLI --log-level takes highest precedence, then RUST_LOG, then config.
    let level = shadergen::debug::resolve_level(cli.log_level(), config.log_level.as_deref());
    shadergen::debug::init_log_bridge(level, config.log_file.as_deref());
    log::debug!("shadergen {} starting", shadergen::VERSION);

    let settings = config.resolve()?;
    let orchestrator = BuildOrchestrator::new(settings);
    orchestrator.run()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("shadergen: error: {e:#}");
        std::process::exit(1);
    }
}
