// SQLite用SQLジェネレーター
//
// スキーマ定義からSQLite用のDDL文を生成します。
// SQLiteはカラム定義の変更とプライマリキーの変更をサポートしません。

use crate::adapters::sql_generator::{build_column_definition, normalize_default, SqlGenerator};
use crate::adapters::sql_quote::{quote_columns, quote_identifier_sqlite};
use crate::core::config::Dialect;
use crate::core::schema::{Column, ColumnType, Index, Table};

/// SQLite用SQLジェネレーター
#[derive(Debug, Clone, Default)]
pub struct SqliteSqlGenerator {}

impl SqliteSqlGenerator {
    /// 新しいSqliteSqlGeneratorを作成
    pub fn new() -> Self {
        Self {}
    }

    /// インラインの `INTEGER PRIMARY KEY AUTOINCREMENT` にするカラム名
    ///
    /// 単一カラムの整数プライマリキーが自動増分の場合のみ該当します。
    fn inline_primary_key<'a>(&self, table: &'a Table) -> Option<&'a str> {
        match table.primary_key.as_slice() {
            [single] => table
                .get_column(single)
                .filter(|c| c.auto_increment && c.column_type.is_integer())
                .map(|c| c.name.as_str()),
            _ => None,
        }
    }
}

impl SqlGenerator for SqliteSqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    fn map_column_type(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Integer { .. } | ColumnType::BigInt { .. } => "INTEGER".to_string(),
            ColumnType::Varchar { length } => format!("VARCHAR({})", length),
            ColumnType::Text | ColumnType::Json => "TEXT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Double => "REAL".to_string(),
            ColumnType::Decimal { precision, scale } => {
                format!("NUMERIC({}, {})", precision, scale)
            }
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime => "DATETIME".to_string(),
        }
    }

    fn column_definition(&self, column: &Column) -> String {
        let type_str = self.map_column_type(&column.column_type);
        build_column_definition(&quote_identifier_sqlite(&column.name), column, type_str, &[])
    }

    fn column_signature(&self, column: &Column) -> String {
        // 符号と自動増分はSQLiteの型情報に残らないため比較しない
        format!(
            "{}|{}|{}",
            self.map_column_type(&column.column_type),
            if column.nullable { "NULL" } else { "NOT NULL" },
            normalize_default(column.default_value.as_deref())
        )
    }

    fn generate_create_table(&self, table: &Table) -> String {
        let inline_pk = self.inline_primary_key(table);

        let mut elements: Vec<String> = table
            .columns
            .iter()
            .map(|column| {
                if inline_pk == Some(column.name.as_str()) {
                    format!(
                        "    {} INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT",
                        quote_identifier_sqlite(&column.name)
                    )
                } else {
                    format!("    {}", self.column_definition(column))
                }
            })
            .collect();

        if inline_pk.is_none() && !table.primary_key.is_empty() {
            elements.push(format!(
                "    PRIMARY KEY ({})",
                quote_columns(Dialect::SQLite, &table.primary_key)
            ));
        }

        format!(
            "CREATE TABLE {} (\n{}\n)",
            quote_identifier_sqlite(&table.name),
            elements.join(",\n")
        )
    }

    fn generate_modify_column(&self, _table_name: &str, _column: &Column) -> Option<String> {
        None
    }

    fn generate_change_primary_key(
        &self,
        _table_name: &str,
        _old_columns: &[String],
        _new_columns: &[String],
    ) -> Option<String> {
        None
    }

    fn generate_drop_index(&self, _table_name: &str, index: &Index) -> String {
        format!("DROP INDEX {}", quote_identifier_sqlite(&index.name))
    }
}
