// スキーマ差分ドメインモデル
//
// 現在のスキーマと目標スキーマの差分を表現する型システム。
// テーブル、カラム、プライマリキー、インデックスの追加・削除・変更を表現します。

use serde::{Deserialize, Serialize};

use crate::core::schema::{Column, Index, Table};

/// スキーマ差分
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// 追加されたテーブル
    pub added_tables: Vec<Table>,

    /// 削除されたテーブル
    pub removed_tables: Vec<String>,

    /// 変更されたテーブル
    pub modified_tables: Vec<TableDiff>,
}

impl SchemaDiff {
    /// 新しいスキーマ差分を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 差分が空かどうか
    pub fn is_empty(&self) -> bool {
        self.added_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.modified_tables.is_empty()
    }

    /// 差分の項目数を取得
    pub fn count(&self) -> usize {
        self.added_tables.len() + self.removed_tables.len() + self.modified_tables.len()
    }

    /// データ損失を伴う変更を含むかどうか
    pub fn has_destructive_changes(&self) -> bool {
        !self.removed_tables.is_empty()
            || self
                .modified_tables
                .iter()
                .any(|t| t.has_destructive_changes())
    }
}

/// テーブル差分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDiff {
    /// テーブル名
    pub table_name: String,

    /// 追加されたカラム
    pub added_columns: Vec<Column>,

    /// 削除されたカラム
    pub removed_columns: Vec<String>,

    /// 変更されたカラム
    pub modified_columns: Vec<ColumnDiff>,

    /// プライマリキーの変更
    pub primary_key_change: Option<PrimaryKeyChange>,

    /// 追加されたインデックス
    pub added_indexes: Vec<Index>,

    /// 削除されたインデックス
    pub removed_indexes: Vec<Index>,
}

impl TableDiff {
    /// 新しいテーブル差分を作成
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            added_columns: Vec::new(),
            removed_columns: Vec::new(),
            modified_columns: Vec::new(),
            primary_key_change: None,
            added_indexes: Vec::new(),
            removed_indexes: Vec::new(),
        }
    }

    /// 差分が空かどうか
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.primary_key_change.is_none()
            && self.added_indexes.is_empty()
            && self.removed_indexes.is_empty()
    }

    /// データ損失を伴う変更を含むかどうか
    pub fn has_destructive_changes(&self) -> bool {
        !self.removed_columns.is_empty() || !self.removed_indexes.is_empty()
    }
}

/// カラム差分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDiff {
    /// カラム名
    pub column_name: String,

    /// 変更前のカラム定義
    pub old_column: Column,

    /// 変更後のカラム定義
    pub new_column: Column,
}

/// プライマリキーの変更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyChange {
    /// 変更前のカラム
    pub old_columns: Vec<String>,
    /// 変更後のカラム
    pub new_columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ColumnType;

    #[test]
    fn test_empty_diff() {
        let diff = SchemaDiff::new();
        assert!(diff.is_empty());
        assert_eq!(diff.count(), 0);
        assert!(!diff.has_destructive_changes());
    }

    #[test]
    fn test_destructive_detection() {
        let mut table_diff = TableDiff::new("node");
        table_diff.added_columns.push(Column::new("title", ColumnType::Text, true));
        assert!(!table_diff.has_destructive_changes());

        table_diff.removed_columns.push("legacy".to_string());
        assert!(table_diff.has_destructive_changes());

        let mut diff = SchemaDiff::new();
        diff.modified_tables.push(table_diff);
        assert!(diff.has_destructive_changes());
    }
}
