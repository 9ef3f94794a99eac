use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod domain;
mod keyring;
mod services;

use cli::{Cli, Commands};
use keyring::KeyringError;
use services::output::error_envelope;

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Preprocess { .. } | Commands::Analyze { .. } => {
            commands::handle_pipeline_commands(cli)
        }
        Commands::Top { .. } | Commands::Report { .. } => commands::handle_report_commands(cli),
    }
}

fn error_code(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<KeyringError>() {
        Some(e) => e.code(),
        None => "ERROR",
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        if cli.json {
            println!("{}", error_envelope(error_code(&err), &err.to_string()));
        } else {
            eprintln!("error: {:#}", err);
        }
        std::process::exit(1);
    }
}
