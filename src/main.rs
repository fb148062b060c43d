use anyhow::Result;
use clap::Parser;
use fluxapi::cli::commands::migrate::{MigrateCommand, MigrateCommandHandler};
use fluxapi::cli::commands::models::{ModelsCommand, ModelsCommandHandler};
use fluxapi::cli::commands::validate::{ValidateCommand, ValidateCommandHandler};
use fluxapi::cli::{Cli, Commands};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // CLIをパースして実行
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_tracing(cli.verbose);

    // 非同期ランタイムを作成して実行
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Failed to create Tokio runtime: {}", e);
            process::exit(1);
        }
    };

    match runtime.block_on(run_command(cli)) {
        Ok((output, success)) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            if !success {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// トレーシングを初期化する（RUST_LOG が優先）
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "fluxapi=debug" } else { "fluxapi=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// コマンドを実行する
///
/// 出力と、終了コードを0にするかどうかを返す
async fn run_command(cli: Cli) -> Result<(String, bool)> {
    let config_path = cli.config;

    match cli.command {
        Commands::Migrate {
            dry_run,
            allow_destructive,
        } => {
            let handler = MigrateCommandHandler::new();
            let command = MigrateCommand {
                config_path,
                dry_run,
                allow_destructive,
            };
            Ok((handler.execute(&command).await?, true))
        }

        Commands::Validate => {
            let handler = ValidateCommandHandler::new();
            let output = handler.execute(&ValidateCommand { config_path })?;
            Ok((output.summary, output.valid))
        }

        Commands::Models => {
            let handler = ModelsCommandHandler::new();
            Ok((handler.execute(&ModelsCommand { config_path })?, true))
        }
    }
}
