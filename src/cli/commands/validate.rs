// validateコマンドハンドラー
//
// モデル定義の検証結果を表示します。

use crate::cli::command_context::CommandContext;
use crate::core::error::ValidationResult;
use crate::services::model_validator::ModelValidatorService;
use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// validateコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ValidateCommand {
    /// 設定ファイルのパス
    pub config_path: Option<PathBuf>,
}

/// validateコマンドの出力
#[derive(Debug, Clone)]
pub struct ValidateOutput {
    /// 表示用のサマリー
    pub summary: String,
    /// エラーがなかったかどうか
    pub valid: bool,
}

/// validateコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct ValidateCommandHandler {}

impl ValidateCommandHandler {
    pub fn new() -> Self {
        Self {}
    }

    /// validateコマンドを実行
    pub fn execute(&self, command: &ValidateCommand) -> Result<ValidateOutput> {
        let context = CommandContext::load(command.config_path.as_deref())?;
        let api = context.build_api()?;

        let result = ModelValidatorService::new().validate_all(api.registry());
        Ok(ValidateOutput {
            summary: self.format_validation_result(&result, api.registry().models().len()),
            valid: result.is_valid(),
        })
    }

    /// 検証結果をフォーマット
    pub fn format_validation_result(&self, result: &ValidationResult, model_count: usize) -> String {
        let mut output = String::new();

        output.push_str("=== Model Validation Results ===\n\n");

        if !result.errors.is_empty() {
            output.push_str(&format!(
                "{}\n\n",
                format!("❌ {} error(s) found:", result.errors.len()).red()
            ));

            for (i, error) in result.errors.iter().enumerate() {
                output.push_str(&format!("{}. {}\n", i + 1, error));
                if let Some(suggestion) = error.suggestion() {
                    output.push_str(&format!("   Suggestion: {}\n", suggestion));
                }
                output.push('\n');
            }
        }

        for warning in &result.warnings {
            output.push_str(&format!("{}\n", format!("⚠ {}", warning).yellow()));
        }

        output.push_str(&format!("\nModels: {}\n", model_count));
        output.push_str("\n=== Result ===\n");
        if result.is_valid() {
            output.push_str(&format!(
                "{}\n",
                "✓ Validation complete. No errors found.".green()
            ));
        } else {
            output.push_str(&format!(
                "✗ Validation complete. {} error(s) found.\n",
                result.errors.len()
            ));
        }

        output
    }
}
