// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// FluxAPI - Model and Storage Management CLI
///
/// Validate model definitions and migrate storage schemas to match them.
#[derive(Parser, Debug)]
#[command(name = "fluxapi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Model definition and storage schema management CLI")]
#[command(propagate_version = true)]
#[command(after_help = "GETTING STARTED:
  1. Write fluxapi.yaml and model files under models/
  2. Check the definitions:       fluxapi validate
  3. Preview schema changes:      fluxapi migrate --dry-run
  4. Apply schema changes:        fluxapi migrate

For detailed help on each command, use: fluxapi <command> --help")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate storage schemas to match the model definitions
    ///
    /// Reflects every registered model into tables, compares them with the
    /// live database and executes the statements needed to close the gap.
    ///
    /// EXAMPLES:
    ///   # Preview the statements
    ///   fluxapi migrate --dry-run
    ///
    ///   # Also drop tables, columns and indexes no model needs
    ///   fluxapi migrate --allow-destructive
    Migrate {
        /// Dry run - show SQL without executing
        #[arg(long)]
        dry_run: bool,

        /// Allow destructive changes (DROP TABLE, DROP COLUMN, DROP INDEX)
        #[arg(long)]
        allow_destructive: bool,
    },

    /// Validate model definitions
    ///
    /// Checks field names, relation targets, primary keys and type parameters.
    Validate,

    /// List registered models and the storage each one uses
    Models,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_migrate() {
        let cli = Cli::try_parse_from(["fluxapi", "migrate", "--dry-run"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Migrate {
                dry_run: true,
                allow_destructive: false
            }
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["fluxapi", "validate", "--config", "app.yaml", "-v", "--no-color"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("app.yaml")));
        assert!(cli.verbose);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Validate));
    }

    #[test]
    fn test_unknown_subcommand() {
        assert!(Cli::try_parse_from(["fluxapi", "rollback"]).is_err());
    }
}
