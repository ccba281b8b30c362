use anyhow::{Context, Result};
use clap::Parser;
use shadergen_scribe::cli::Cli;
use std::io::Write;

fn run(cli: &Cli) -> Result<()> {
    let text = cli.execute()?;
    match &cli.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => std::io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .context("Failed to write to standard output")?,
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("scribe: error: {e:#}");
        std::process::exit(1);
    }
}
