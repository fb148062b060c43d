// MySQL用SQLジェネレーター
//
// スキーマ定義からMySQL用のDDL文を生成します。

use crate::adapters::sql_generator::{build_column_definition, normalize_default, SqlGenerator};
use crate::adapters::sql_quote::{quote_columns, quote_identifier_mysql};
use crate::core::config::Dialect;
use crate::core::schema::{Column, ColumnType, Index, Table};

/// MySQL用SQLジェネレーター
#[derive(Debug, Clone, Default)]
pub struct MysqlSqlGenerator {}

impl MysqlSqlGenerator {
    /// 新しいMysqlSqlGeneratorを作成
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlGenerator for MysqlSqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::MySQL
    }

    fn map_column_type(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Integer { unsigned: true } => "INT UNSIGNED".to_string(),
            ColumnType::Integer { unsigned: false } => "INT".to_string(),
            ColumnType::BigInt { unsigned: true } => "BIGINT UNSIGNED".to_string(),
            ColumnType::BigInt { unsigned: false } => "BIGINT".to_string(),
            ColumnType::Varchar { length } => format!("VARCHAR({})", length),
            ColumnType::Text => "LONGTEXT".to_string(),
            ColumnType::Boolean => "TINYINT(1)".to_string(),
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Decimal { precision, scale } => {
                format!("DECIMAL({}, {})", precision, scale)
            }
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime => "DATETIME".to_string(),
            ColumnType::Json => "JSON".to_string(),
        }
    }

    fn column_definition(&self, column: &Column) -> String {
        let type_str = self.map_column_type(&column.column_type);
        let auto_increment = if column.auto_increment {
            "AUTO_INCREMENT"
        } else {
            ""
        };
        build_column_definition(
            &quote_identifier_mysql(&column.name),
            column,
            type_str,
            &[auto_increment],
        )
    }

    fn column_signature(&self, column: &Column) -> String {
        format!(
            "{}|{}|{}|{}",
            self.map_column_type(&column.column_type),
            if column.nullable { "NULL" } else { "NOT NULL" },
            normalize_default(column.default_value.as_deref()),
            column.auto_increment
        )
    }

    fn generate_create_table(&self, table: &Table) -> String {
        let mut elements: Vec<String> = table
            .columns
            .iter()
            .map(|column| format!("    {}", self.column_definition(column)))
            .collect();

        if !table.primary_key.is_empty() {
            elements.push(format!(
                "    PRIMARY KEY ({})",
                quote_columns(Dialect::MySQL, &table.primary_key)
            ));
        }

        format!(
            "CREATE TABLE {} (\n{}\n) DEFAULT CHARACTER SET utf8mb4",
            quote_identifier_mysql(&table.name),
            elements.join(",\n")
        )
    }

    fn generate_modify_column(&self, table_name: &str, column: &Column) -> Option<String> {
        // MODIFY COLUMNは完全なカラム定義が必要
        Some(format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            quote_identifier_mysql(table_name),
            self.column_definition(column)
        ))
    }

    fn generate_change_primary_key(
        &self,
        table_name: &str,
        old_columns: &[String],
        new_columns: &[String],
    ) -> Option<String> {
        let mut clauses = Vec::new();
        if !old_columns.is_empty() {
            clauses.push("DROP PRIMARY KEY".to_string());
        }
        if !new_columns.is_empty() {
            clauses.push(format!(
                "ADD PRIMARY KEY ({})",
                quote_columns(Dialect::MySQL, new_columns)
            ));
        }
        if clauses.is_empty() {
            return None;
        }

        Some(format!(
            "ALTER TABLE {} {}",
            quote_identifier_mysql(table_name),
            clauses.join(", ")
        ))
    }

    fn generate_drop_index(&self, table_name: &str, index: &Index) -> String {
        format!(
            "DROP INDEX {} ON {}",
            quote_identifier_mysql(&index.name),
            quote_identifier_mysql(table_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_column() -> Column {
        let mut column = Column::new("id", ColumnType::Integer { unsigned: true }, false);
        column.auto_increment = true;
        column
    }

    #[test]
    fn test_column_definition() {
        let generator = MysqlSqlGenerator::new();
        assert_eq!(
            generator.column_definition(&id_column()),
            "`id` INT UNSIGNED NOT NULL AUTO_INCREMENT"
        );

        let mut status = Column::new("status", ColumnType::Varchar { length: 20 }, true);
        status.default_value = Some("'draft'".to_string());
        assert_eq!(
            generator.column_definition(&status),
            "`status` VARCHAR(20) DEFAULT 'draft'"
        );
    }

    #[test]
    fn test_generate_create_table() {
        let generator = MysqlSqlGenerator::new();
        let mut table = Table::new("node");
        table.add_column(id_column());
        table.add_column(Column::new("title", ColumnType::Varchar { length: 255 }, true));
        table.set_primary_key(vec!["id".to_string()]);

        let sql = generator.generate_create_table(&table);
        assert_eq!(
            sql,
            "CREATE TABLE `node` (\n    `id` INT UNSIGNED NOT NULL AUTO_INCREMENT,\n    `title` VARCHAR(255),\n    PRIMARY KEY (`id`)\n) DEFAULT CHARACTER SET utf8mb4"
        );
    }

    #[test]
    fn test_generate_change_primary_key() {
        let generator = MysqlSqlGenerator::new();
        let sql = generator.generate_change_primary_key(
            "node",
            &["id".to_string()],
            &["id".to_string(), "lang".to_string()],
        );
        assert_eq!(
            sql.as_deref(),
            Some("ALTER TABLE `node` DROP PRIMARY KEY, ADD PRIMARY KEY (`id`, `lang`)")
        );
        assert!(generator.generate_change_primary_key("node", &[], &[]).is_none());
    }

    #[test]
    fn test_column_signature_detects_nullability() {
        let generator = MysqlSqlGenerator::new();
        let nullable = Column::new("title", ColumnType::Text, true);
        let required = Column::new("title", ColumnType::Text, false);
        assert_ne!(
            generator.column_signature(&nullable),
            generator.column_signature(&required)
        );
    }
}
