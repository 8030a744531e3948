use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use scmver::cli::orchestration::{run_generate, run_load, run_next, run_stat};
use scmver::cli::{Cli, Commands};
use scmver::config;
use scmver::scm::Registry;
use scmver::ui;
use scmver::ScmverError;

/// Environment variable holding the log filter
const LOG_ENV: &str = "SCMVER_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        ui::display_error(&format!("{:#}", e));
        let code = match e.downcast_ref::<ScmverError>() {
            Some(err) if err.is_usage() => 2,
            _ => 1,
        };
        process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref()).context("Error loading config")?;
    let registry = Registry::builtin();

    match cli.command {
        Commands::Stat(args) => {
            let state = run_stat(&args, &config, &registry)?;
            ui::print_state(state.as_ref());
        }
        Commands::Next(args) => {
            if let Some(version) = run_next(&args, &config, &registry)? {
                println!("{}", version);
            }
        }
        Commands::Generate(args) => match run_generate(&args, &config, &registry)? {
            Some(version) => {
                ui::display_success(&format!("Wrote {} to {}", version, args.file.display()))
            }
            None => ui::display_status("No repository found, version file left untouched"),
        },
        Commands::Load(args) => println!("{}", run_load(&args)?),
    }
    Ok(())
}
