// マイグレーション生成サービス
//
// スキーマ差分から実行順に並んだSQL文（MigrationPlan）を生成するサービス。
// 破壊的な文は許可されている場合のみ計画に含め、それ以外は保留として記録します。

use crate::adapters::sql_generator::{create_generator, SqlGenerator};
use crate::core::config::Dialect;
use crate::core::migration::MigrationPlan;
use crate::core::schema_diff::SchemaDiff;
use tracing::debug;

/// マイグレーション生成サービス
#[derive(Debug, Clone)]
pub struct MigrationGenerator {
    dialect: Dialect,
}

impl MigrationGenerator {
    /// 新しいMigrationGeneratorを作成
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// マイグレーション計画を生成
    ///
    /// 文の順序は、テーブル作成、インデックス削除、カラム追加、カラム変更、
    /// プライマリキー変更、インデックス作成、カラム削除、テーブル削除です。
    ///
    /// # Arguments
    ///
    /// * `diff` - スキーマ差分
    /// * `allow_destructive` - テーブル・カラム・インデックスの削除を許可するか
    ///
    /// # Returns
    ///
    /// マイグレーション計画
    pub fn generate(&self, diff: &SchemaDiff, allow_destructive: bool) -> MigrationPlan {
        let generator = create_generator(self.dialect);
        let mut plan = MigrationPlan::new(self.dialect);

        for table in &diff.added_tables {
            plan.statements.push(generator.generate_create_table(table));
            for index in &table.indexes {
                plan.statements
                    .push(generator.generate_create_index(&table.name, index));
            }
        }

        for table_diff in &diff.modified_tables {
            for index in &table_diff.removed_indexes {
                let sql = generator.generate_drop_index(&table_diff.table_name, index);
                let replaced = table_diff
                    .added_indexes
                    .iter()
                    .any(|added| added.name == index.name);
                if replaced {
                    plan.statements.push(sql);
                } else {
                    push_destructive(&mut plan, sql, allow_destructive);
                }
            }
        }

        for table_diff in &diff.modified_tables {
            for column in &table_diff.added_columns {
                plan.statements
                    .push(generator.generate_add_column(&table_diff.table_name, column));
            }
        }

        for table_diff in &diff.modified_tables {
            for column_diff in &table_diff.modified_columns {
                match generator.generate_modify_column(&table_diff.table_name, &column_diff.new_column)
                {
                    Some(sql) => plan.statements.push(sql),
                    None => plan.warnings.push(format!(
                        "{} cannot modify column '{}.{}' in place ({} -> {})",
                        self.dialect,
                        table_diff.table_name,
                        column_diff.column_name,
                        generator.column_signature(&column_diff.old_column),
                        generator.column_signature(&column_diff.new_column)
                    )),
                }
            }
        }

        for table_diff in &diff.modified_tables {
            if let Some(change) = &table_diff.primary_key_change {
                match generator.generate_change_primary_key(
                    &table_diff.table_name,
                    &change.old_columns,
                    &change.new_columns,
                ) {
                    Some(sql) => plan.statements.push(sql),
                    None => plan.warnings.push(format!(
                        "{} cannot change the primary key of '{}' ({:?} -> {:?})",
                        self.dialect, table_diff.table_name, change.old_columns, change.new_columns
                    )),
                }
            }
        }

        for table_diff in &diff.modified_tables {
            for index in &table_diff.added_indexes {
                plan.statements
                    .push(generator.generate_create_index(&table_diff.table_name, index));
            }
        }

        for table_diff in &diff.modified_tables {
            for column_name in &table_diff.removed_columns {
                let sql = generator.generate_drop_column(&table_diff.table_name, column_name);
                push_destructive(&mut plan, sql, allow_destructive);
            }
        }

        for table_name in &diff.removed_tables {
            let sql = generator.generate_drop_table(table_name);
            push_destructive(&mut plan, sql, allow_destructive);
        }

        debug!(
            dialect = %self.dialect,
            statements = plan.statements.len(),
            skipped = plan.skipped_destructive.len(),
            warnings = plan.warnings.len(),
            "Generated migration plan"
        );

        plan
    }
}

fn push_destructive(plan: &mut MigrationPlan, sql: String, allow_destructive: bool) {
    if allow_destructive {
        plan.statements.push(sql);
    } else {
        plan.skipped_destructive.push(sql);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ColumnType, Index, Table};
    use crate::core::schema_diff::{ColumnDiff, PrimaryKeyChange, TableDiff};

    fn node_table() -> Table {
        let mut table = Table::new("node");
        let mut id = Column::new("id", ColumnType::Integer { unsigned: true }, false);
        id.auto_increment = true;
        table.add_column(id);
        table.set_primary_key(vec!["id".to_string()]);
        table.add_index(Index::new("uniq_node_slug", vec!["id".to_string()], true));
        table
    }

    fn modified_diff() -> SchemaDiff {
        let mut table_diff = TableDiff::new("node");
        table_diff
            .added_columns
            .push(Column::new("title", ColumnType::Varchar { length: 255 }, true));
        table_diff.modified_columns.push(ColumnDiff {
            column_name: "body".to_string(),
            old_column: Column::new("body", ColumnType::Varchar { length: 255 }, true),
            new_column: Column::new("body", ColumnType::Text, true),
        });
        table_diff.removed_columns.push("legacy".to_string());
        table_diff
            .removed_indexes
            .push(Index::new("idx_stale", vec!["legacy".to_string()], false));

        let mut diff = SchemaDiff::new();
        diff.modified_tables.push(table_diff);
        diff.removed_tables.push("old_table".to_string());
        diff
    }

    #[test]
    fn test_create_table_with_indexes() {
        let mut diff = SchemaDiff::new();
        diff.added_tables.push(node_table());

        let plan = MigrationGenerator::new(Dialect::MySQL).generate(&diff, false);
        assert_eq!(plan.statements.len(), 2);
        assert!(plan.statements[0].starts_with("CREATE TABLE `node`"));
        assert_eq!(
            plan.statements[1],
            "CREATE UNIQUE INDEX `uniq_node_slug` ON `node` (`id`)"
        );
    }

    #[test]
    fn test_destructive_statements_are_skipped() {
        let plan = MigrationGenerator::new(Dialect::MySQL).generate(&modified_diff(), false);

        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE `node` ADD COLUMN `title` VARCHAR(255)".to_string(),
                "ALTER TABLE `node` MODIFY COLUMN `body` LONGTEXT".to_string(),
            ]
        );
        assert_eq!(
            plan.skipped_destructive,
            vec![
                "DROP INDEX `idx_stale` ON `node`".to_string(),
                "ALTER TABLE `node` DROP COLUMN `legacy`".to_string(),
                "DROP TABLE `old_table`".to_string(),
            ]
        );
    }

    #[test]
    fn test_destructive_statements_are_ordered_when_allowed() {
        let plan = MigrationGenerator::new(Dialect::MySQL).generate(&modified_diff(), true);

        assert!(plan.skipped_destructive.is_empty());
        assert_eq!(plan.statements[0], "DROP INDEX `idx_stale` ON `node`");
        assert_eq!(plan.statements.last().unwrap(), "DROP TABLE `old_table`");
    }

    #[test]
    fn test_replaced_index_is_always_dropped() {
        let mut table_diff = TableDiff::new("node");
        table_diff
            .removed_indexes
            .push(Index::new("uniq_node_slug", vec!["slug".to_string()], false));
        table_diff
            .added_indexes
            .push(Index::new("uniq_node_slug", vec!["slug".to_string()], true));
        let mut diff = SchemaDiff::new();
        diff.modified_tables.push(table_diff);

        let plan = MigrationGenerator::new(Dialect::SQLite).generate(&diff, false);
        assert_eq!(
            plan.statements,
            vec![
                "DROP INDEX \"uniq_node_slug\"".to_string(),
                "CREATE UNIQUE INDEX \"uniq_node_slug\" ON \"node\" (\"slug\")".to_string(),
            ]
        );
    }

    #[test]
    fn test_sqlite_unsupported_changes_become_warnings() {
        let mut table_diff = TableDiff::new("node");
        table_diff.modified_columns.push(ColumnDiff {
            column_name: "title".to_string(),
            old_column: Column::new("title", ColumnType::Varchar { length: 255 }, true),
            new_column: Column::new("title", ColumnType::Varchar { length: 100 }, true),
        });
        table_diff.primary_key_change = Some(PrimaryKeyChange {
            old_columns: vec!["id".to_string()],
            new_columns: vec!["uuid".to_string()],
        });
        let mut diff = SchemaDiff::new();
        diff.modified_tables.push(table_diff);

        let plan = MigrationGenerator::new(Dialect::SQLite).generate(&diff, true);
        assert!(plan.statements.is_empty());
        assert_eq!(plan.warnings.len(), 2);
        assert!(plan.warnings[0].contains("node.title"));
        assert!(plan.warnings[1].contains("primary key"));
    }
}
