// SQL生成アダプター
//
// スキーマ定義から各データベース方言用のDDL文を生成するアダプター層。

pub mod mysql;
pub mod sqlite;

use crate::adapters::sql_quote::{quote_columns, quote_identifier};
use crate::core::config::Dialect;
use crate::core::schema::{Column, ColumnType, Index, Table};

pub use mysql::MysqlSqlGenerator;
pub use sqlite::SqliteSqlGenerator;

/// カラム定義の共通組み立てヘルパー
pub(crate) fn build_column_definition(
    quoted_name: &str,
    column: &Column,
    type_str: String,
    extra_parts: &[&str],
) -> String {
    let mut parts = vec![quoted_name.to_string(), type_str];

    if !column.nullable {
        parts.push("NOT NULL".to_string());
    }

    for part in extra_parts {
        if !part.is_empty() {
            parts.push((*part).to_string());
        }
    }

    if let Some(ref default_value) = column.default_value {
        parts.push(format!("DEFAULT {}", default_value));
    }

    parts.join(" ")
}

/// デフォルト値を比較用に正規化
///
/// 方言によって `'abc'` と `abc` のどちらで返るかが異なるため、外側の引用符を外します。
pub(crate) fn normalize_default(default_value: Option<&str>) -> String {
    match default_value {
        None => String::new(),
        Some(value) if value.eq_ignore_ascii_case("null") => String::new(),
        Some(value) => value
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim_matches('\'')
            .to_string(),
    }
}

/// SQLジェネレータートレイト
///
/// 各データベース方言用のSQLジェネレーターが実装すべきインターフェース。
pub trait SqlGenerator: Send + Sync {
    /// 方言を取得
    fn dialect(&self) -> Dialect;

    /// ColumnTypeを方言の型文字列にマッピング
    fn map_column_type(&self, column_type: &ColumnType) -> String;

    /// カラム定義のSQL文字列を生成
    fn column_definition(&self, column: &Column) -> String;

    /// 比較用のカラムシグネチャを生成
    ///
    /// 反映したスキーマとデータベースから取得したスキーマのカラムが
    /// 同じシグネチャであれば、変更なしとみなされます。
    fn column_signature(&self, column: &Column) -> String;

    /// CREATE TABLE文を生成
    ///
    /// # Arguments
    ///
    /// * `table` - テーブル定義
    ///
    /// # Returns
    ///
    /// CREATE TABLE文のSQL文字列
    fn generate_create_table(&self, table: &Table) -> String;

    /// DROP TABLE文を生成
    fn generate_drop_table(&self, table_name: &str) -> String {
        format!("DROP TABLE {}", quote_identifier(self.dialect(), table_name))
    }

    /// ALTER TABLE ADD COLUMN文を生成
    ///
    /// # Arguments
    ///
    /// * `table_name` - テーブル名
    /// * `column` - 追加するカラム
    fn generate_add_column(&self, table_name: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_identifier(self.dialect(), table_name),
            self.column_definition(column)
        )
    }

    /// カラム定義変更のALTER TABLE文を生成
    ///
    /// 方言がサポートしない場合は None を返します。
    fn generate_modify_column(&self, table_name: &str, column: &Column) -> Option<String>;

    /// ALTER TABLE DROP COLUMN文を生成
    fn generate_drop_column(&self, table_name: &str, column_name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_identifier(self.dialect(), table_name),
            quote_identifier(self.dialect(), column_name)
        )
    }

    /// プライマリキー変更のALTER TABLE文を生成
    ///
    /// 方言がサポートしない場合は None を返します。
    fn generate_change_primary_key(
        &self,
        table_name: &str,
        old_columns: &[String],
        new_columns: &[String],
    ) -> Option<String>;

    /// CREATE INDEX文を生成
    ///
    /// # Arguments
    ///
    /// * `table_name` - テーブル名
    /// * `index` - インデックス定義
    fn generate_create_index(&self, table_name: &str, index: &Index) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            quote_identifier(self.dialect(), &index.name),
            quote_identifier(self.dialect(), table_name),
            quote_columns(self.dialect(), &index.columns)
        )
    }

    /// DROP INDEX文を生成
    fn generate_drop_index(&self, table_name: &str, index: &Index) -> String;
}

/// 方言に応じたSQLジェネレーターを作成
pub fn create_generator(dialect: Dialect) -> Box<dyn SqlGenerator> {
    match dialect {
        Dialect::MySQL => Box::new(MysqlSqlGenerator::new()),
        Dialect::SQLite => Box::new(SqliteSqlGenerator::new()),
    }
}
