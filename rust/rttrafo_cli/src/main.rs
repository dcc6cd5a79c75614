mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{
    debug,
    error,
};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn run(args: Cli) -> Result<(), errors::CliError> {
    if let Some(dir) = args.write_template.as_deref() {
        return config::main_write_template(dir);
    }
    let config = Config::with_cli_args(&args)?;
    debug!("Parsed configuration: {:#?}", config);
    processing::main_loop(&config.files, &config.batch)?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    let args = Cli::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
