// modelsコマンドハンドラー
//
// 登録されたモデルと、各モデルが使用するStorageプラグイン・テーブル名を一覧表示します。

use crate::cli::command_context::CommandContext;
use crate::core::model::ModelDefinition;
use crate::core::naming;
use anyhow::Result;
use std::path::PathBuf;

/// modelsコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ModelsCommand {
    /// 設定ファイルのパス
    pub config_path: Option<PathBuf>,
}

/// modelsコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct ModelsCommandHandler {}

impl ModelsCommandHandler {
    pub fn new() -> Self {
        Self {}
    }

    pub fn execute(&self, command: &ModelsCommand) -> Result<String> {
        let context = CommandContext::load(command.config_path.as_deref())?;
        let api = context.build_api()?;

        let rows: Vec<(ModelDefinition, String)> = api
            .registry()
            .get_models()
            .into_iter()
            .map(|definition| {
                let storage = api.storages().plugin_name(&definition.name).to_string();
                (definition, storage)
            })
            .collect();

        Ok(self.format_models(&rows, &context.config.storage.table_prefix))
    }

    /// モデル一覧をテーブル形式でフォーマット
    pub fn format_models(&self, rows: &[(ModelDefinition, String)], table_prefix: &str) -> String {
        if rows.is_empty() {
            return "No models registered.\n".to_string();
        }

        let name_width = rows
            .iter()
            .map(|(d, _)| d.name.len())
            .max()
            .unwrap_or(0)
            .max("Model".len());
        let storage_width = rows
            .iter()
            .map(|(_, s)| s.len())
            .max()
            .unwrap_or(0)
            .max("Storage".len());

        let mut output = format!(
            "{:<name_width$}  {:<storage_width$}  {:<24}  Fields  Relations\n",
            "Model", "Storage", "Table"
        );
        for (definition, storage) in rows {
            output.push_str(&format!(
                "{:<name_width$}  {:<storage_width$}  {:<24}  {:>6}  {:>9}\n",
                definition.name,
                storage,
                naming::table_name(table_prefix, &definition.name),
                definition.data_fields().count(),
                definition.relation_fields().count()
            ));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::{Field, FieldType, RelationType};

    #[test]
    fn test_format_models() {
        let node = ModelDefinition::new("Node")
            .with_field(Field::new("title", FieldType::String))
            .with_field(Field::relation("tags", "Tag", RelationType::BelongsToMany));
        let rows = vec![(node, "Sqlite".to_string())];

        let output = ModelsCommandHandler::new().format_models(&rows, "flux_");
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("Model"));
        assert!(lines[1].contains("flux_node"));
        assert!(lines[1].contains("Sqlite"));
        assert!(lines[1].trim_end().ends_with('1'));
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(
            ModelsCommandHandler::new().format_models(&[], ""),
            "No models registered.\n"
        );
    }
}
