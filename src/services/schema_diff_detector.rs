// スキーマ差分検出サービス
//
// 2つのスキーマ間の差分を検出するサービス。
// テーブル、カラム、プライマリキー、インデックスの追加、削除、変更を検出します。
// カラムの同一性は方言ごとのカラムシグネチャで判定します。

use crate::adapters::sql_generator::create_generator;
use crate::core::config::Dialect;
use crate::core::schema::{Schema, Table};
use crate::core::schema_diff::{ColumnDiff, PrimaryKeyChange, SchemaDiff, TableDiff};

/// スキーマ差分検出サービス
#[derive(Debug, Clone)]
pub struct SchemaDiffDetector {
    dialect: Dialect,
}

impl SchemaDiffDetector {
    /// 新しいSchemaDiffDetectorを作成
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// スキーマ差分を検出
    ///
    /// # Arguments
    ///
    /// * `old_schema` - 変更前のスキーマ（データベースの現状）
    /// * `new_schema` - 変更後のスキーマ（モデル定義から反映したもの）
    ///
    /// # Returns
    ///
    /// スキーマ差分（テーブル名順）
    pub fn detect_diff(&self, old_schema: &Schema, new_schema: &Schema) -> SchemaDiff {
        let mut diff = SchemaDiff::new();

        // 追加されたテーブル
        for (table_name, table) in &new_schema.tables {
            if !old_schema.has_table(table_name) {
                diff.added_tables.push(table.clone());
            }
        }

        // 削除されたテーブル
        for table_name in old_schema.tables.keys() {
            if !new_schema.has_table(table_name) {
                diff.removed_tables.push(table_name.clone());
            }
        }

        // 変更されたテーブル
        for (table_name, old_table) in &old_schema.tables {
            if let Some(new_table) = new_schema.get_table(table_name) {
                let table_diff = self.detect_table_diff(old_table, new_table);
                if !table_diff.is_empty() {
                    diff.modified_tables.push(table_diff);
                }
            }
        }

        diff
    }

    /// テーブル単位の差分を検出
    pub fn detect_table_diff(&self, old_table: &Table, new_table: &Table) -> TableDiff {
        let generator = create_generator(self.dialect);
        let mut table_diff = TableDiff::new(&new_table.name);

        for new_column in &new_table.columns {
            match old_table.get_column(&new_column.name) {
                None => table_diff.added_columns.push(new_column.clone()),
                Some(old_column) => {
                    if generator.column_signature(old_column)
                        != generator.column_signature(new_column)
                    {
                        table_diff.modified_columns.push(ColumnDiff {
                            column_name: new_column.name.clone(),
                            old_column: old_column.clone(),
                            new_column: new_column.clone(),
                        });
                    }
                }
            }
        }

        for old_column in &old_table.columns {
            if new_table.get_column(&old_column.name).is_none() {
                table_diff.removed_columns.push(old_column.name.clone());
            }
        }

        if old_table.primary_key != new_table.primary_key {
            table_diff.primary_key_change = Some(PrimaryKeyChange {
                old_columns: old_table.primary_key.clone(),
                new_columns: new_table.primary_key.clone(),
            });
        }

        // 同名で定義が異なるインデックスは削除と追加の組として扱う
        for new_index in &new_table.indexes {
            match old_table.get_index(&new_index.name) {
                None => table_diff.added_indexes.push(new_index.clone()),
                Some(old_index) if old_index != new_index => {
                    table_diff.removed_indexes.push(old_index.clone());
                    table_diff.added_indexes.push(new_index.clone());
                }
                Some(_) => {}
            }
        }

        for old_index in &old_table.indexes {
            if new_table.get_index(&old_index.name).is_none() {
                table_diff.removed_indexes.push(old_index.clone());
            }
        }

        table_diff
    }
}
