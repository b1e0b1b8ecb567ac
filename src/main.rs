use clap::Parser;

use election_feed::cli::commands::{init, parse, run};
use election_feed::cli::{Cli, Commands};
use election_feed::config::{DEFAULT_CONFIG_FILE, Settings};
use election_feed::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());

    // Init must work even when the existing file is broken
    if let Commands::Init { force } = cli.command {
        exit_on_error(init::run_init(&config_path, force));
        return;
    }

    let settings = match Settings::load_from(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_with_config(&settings.logging);

    let result = match cli.command {
        Commands::Run {
            dir,
            no_sync,
            no_live,
            debounce_ms,
        } => {
            let args = run::RunArgs {
                dir,
                no_sync,
                no_live,
                debounce_ms,
            };
            run::run(args, settings).await
        }
        Commands::Parse { file, kind } => parse::run(&file, kind.unwrap_or(settings.feed.kind)),
        Commands::Config => init::run_config(&settings),
        Commands::Init { .. } => Ok(()),
    };

    exit_on_error(result);
}

fn exit_on_error(result: anyhow::Result<()>) {
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
