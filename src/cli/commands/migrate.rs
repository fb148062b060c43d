// migrateコマンドハンドラー
//
// モデル定義に合わせてストレージのスキーマを更新します。
// - 設定ファイルとモデル定義の読み込み
// - ストレージごとの差分検出とSQL実行
// - 実行したSQL、保留した破壊的変更、警告の表示

use crate::cli::command_context::CommandContext;
use crate::core::migration::{MigrationOptions, MigrationReport};
use crate::services::model_validator::ModelValidatorService;
use anyhow::{anyhow, Result};
use colored::Colorize;
use std::path::PathBuf;

/// migrateコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct MigrateCommand {
    /// 設定ファイルのパス
    pub config_path: Option<PathBuf>,
    /// SQLを実行せずに表示のみ
    pub dry_run: bool,
    /// 破壊的変更を許可（設定ファイルの指定と OR）
    pub allow_destructive: bool,
}

/// migrateコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct MigrateCommandHandler {}

impl MigrateCommandHandler {
    pub fn new() -> Self {
        Self {}
    }

    /// migrateコマンドを実行
    ///
    /// # Returns
    ///
    /// 成功時は実行結果のサマリー
    pub async fn execute(&self, command: &MigrateCommand) -> Result<String> {
        let context = CommandContext::load(command.config_path.as_deref())?;
        let api = context.build_api()?;

        let validation = ModelValidatorService::new().validate_all(api.registry());
        if !validation.is_valid() {
            return Err(anyhow!(
                "Model definitions are invalid ({} error(s)). Run `fluxapi validate` for details.",
                validation.error_count()
            ));
        }

        let options = MigrationOptions {
            dry_run: command.dry_run,
            allow_destructive: command.allow_destructive
                || context.config.migration.allow_destructive,
        };
        let reports = api.migrate(options).await?;

        Ok(self.format_reports(&reports))
    }

    /// 実行結果をフォーマット
    pub fn format_reports(&self, reports: &[MigrationReport]) -> String {
        let mut output = String::new();

        if reports.is_empty() {
            output.push_str("No models registered. Nothing to migrate.\n");
            return output;
        }

        for report in reports {
            let title = if report.dry_run {
                format!("=== {} (dry run) ===", report.storage)
            } else {
                format!("=== {} ===", report.storage)
            };
            output.push_str(&format!("{}\n", title.bold()));

            if report.is_up_to_date() {
                output.push_str(&format!("{}\n\n", "✓ Schema is up to date.".green()));
                continue;
            }

            for sql in &report.executed {
                output.push_str(&format!("{};\n", sql));
            }

            if !report.skipped_destructive.is_empty() {
                output.push_str(&format!(
                    "\n{}\n",
                    "⚠ Destructive changes skipped (use --allow-destructive):"
                        .yellow()
                        .bold()
                ));
                for sql in &report.skipped_destructive {
                    output.push_str(&format!("{}\n", format!("  {};", sql).red()));
                }
            }

            for warning in &report.warnings {
                output.push_str(&format!("{}\n", format!("⚠ {}", warning).yellow()));
            }

            let verb = if report.dry_run { "planned" } else { "executed" };
            output.push_str(&format!(
                "\n{} statement(s) {} in {}ms\n\n",
                report.executed.len(),
                verb,
                report.duration_ms()
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Dialect;
    use crate::core::migration::MigrationPlan;
    use chrono::Utc;
    use colored::control;

    #[test]
    fn test_format_up_to_date() {
        control::set_override(false);
        let report =
            MigrationReport::from_plan("Sqlite", MigrationPlan::new(Dialect::SQLite), false, Utc::now());

        let output = MigrateCommandHandler::new().format_reports(&[report]);
        assert!(output.contains("=== Sqlite ==="));
        assert!(output.contains("Schema is up to date."));
    }

    #[test]
    fn test_format_dry_run_with_skipped() {
        control::set_override(false);
        let mut plan = MigrationPlan::new(Dialect::SQLite);
        plan.statements.push("CREATE TABLE \"node\" (\"id\" INTEGER)".to_string());
        plan.skipped_destructive.push("DROP TABLE \"legacy\"".to_string());
        let report = MigrationReport::from_plan("Sqlite", plan, true, Utc::now());

        let output = MigrateCommandHandler::new().format_reports(&[report]);
        assert!(output.contains("(dry run)"));
        assert!(output.contains("CREATE TABLE \"node\" (\"id\" INTEGER);"));
        assert!(output.contains("DROP TABLE \"legacy\";"));
        assert!(output.contains("1 statement(s) planned"));
    }

    #[test]
    fn test_format_without_reports() {
        let output = MigrateCommandHandler::new().format_reports(&[]);
        assert!(output.contains("Nothing to migrate"));
    }
}
