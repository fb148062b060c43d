/// マイグレーションパイプラインの統合テスト
///
/// モデル定義の反映、差分検出、SQL生成をデータベースなしで通しで確認します。
use fluxapi::core::config::Dialect;
use fluxapi::core::field::{Field, FieldType, RelationType};
use fluxapi::core::migration::MigrationPlan;
use fluxapi::core::model::ModelDefinition;
use fluxapi::core::schema::Schema;
use fluxapi::services::migration_generator::MigrationGenerator;
use fluxapi::services::model_registry::ModelRegistry;
use fluxapi::services::schema_diff_detector::SchemaDiffDetector;
use fluxapi::services::schema_reflector::SchemaReflector;

fn node_v1() -> ModelDefinition {
    ModelDefinition::new("Node")
        .with_field(Field::new("title", FieldType::String).with_length(120))
        .with_field(Field::new("views", FieldType::Integer).unsigned().with_default(0))
}

fn registry_v1() -> ModelRegistry {
    let registry = ModelRegistry::new();
    registry.register_model(node_v1()).unwrap();
    registry
}

/// v1 に slug とタグのリレーションを追加
fn registry_v2() -> ModelRegistry {
    let registry = registry_v1();
    registry
        .register_model(
            ModelDefinition::new("Tag").with_field(Field::new("label", FieldType::String)),
        )
        .unwrap();
    registry.extend_model(
        "Node",
        vec![
            Field::new("slug", FieldType::String).unique().required(),
            Field::relation("tags", "Tag", RelationType::BelongsToMany),
        ],
    );
    registry
}

fn reflect(registry: &ModelRegistry) -> Schema {
    let reflected = SchemaReflector::new("").reflect(&registry.get_models(), registry);
    assert!(reflected.warnings.is_empty(), "{:?}", reflected.warnings);
    reflected.schema
}

fn plan(dialect: Dialect, old: &Schema, new: &Schema, allow_destructive: bool) -> MigrationPlan {
    let diff = SchemaDiffDetector::new(dialect).detect_diff(old, new);
    MigrationGenerator::new(dialect).generate(&diff, allow_destructive)
}

fn position(plan: &MigrationPlan, prefix: &str) -> usize {
    plan.statements
        .iter()
        .position(|sql| sql.starts_with(prefix))
        .unwrap_or_else(|| panic!("statement '{}' not found in {:?}", prefix, plan.statements))
}

#[cfg(test)]
mod migration_pipeline_tests {
    use super::*;

    /// 空のスキーマからテーブルが作成されることを確認
    #[test]
    fn test_initial_plan_creates_tables() {
        let plan = plan(Dialect::MySQL, &Schema::new(), &reflect(&registry_v1()), false);

        assert_eq!(plan.dialect, Dialect::MySQL);
        assert_eq!(plan.statements.len(), 1);
        let create = &plan.statements[0];
        assert!(create.starts_with("CREATE TABLE `node`"));
        assert!(create.contains("`id` INT UNSIGNED NOT NULL AUTO_INCREMENT"));
        assert!(create.contains("`title` VARCHAR(120)"));
        assert!(create.contains("`views` INT UNSIGNED DEFAULT 0"));
        assert!(create.contains("PRIMARY KEY (`id`)"));
    }

    /// 同じ定義同士では何も生成されないことを確認
    #[test]
    fn test_identical_schemas_produce_empty_plan() {
        let schema = reflect(&registry_v2());
        for dialect in [Dialect::MySQL, Dialect::SQLite] {
            let plan = plan(dialect, &schema, &schema, true);
            assert!(plan.is_empty(), "{:?}", plan);
        }
    }

    /// フィールド追加とリレーション追加の順序を確認
    #[test]
    fn test_extension_plan_ordering() {
        let plan = plan(
            Dialect::MySQL,
            &reflect(&registry_v1()),
            &reflect(&registry_v2()),
            false,
        );

        let create_rel = position(&plan, "CREATE TABLE `node_rel`");
        let create_tag = position(&plan, "CREATE TABLE `tag`");
        let rel_index = position(&plan, "CREATE INDEX `idx_node_rel_node_id` ON `node_rel`");
        let add_slug = position(
            &plan,
            "ALTER TABLE `node` ADD COLUMN `slug` VARCHAR(255) NOT NULL",
        );
        let slug_index = position(
            &plan,
            "CREATE UNIQUE INDEX `uniq_node_slug` ON `node` (`slug`)",
        );

        assert_eq!(rel_index, create_rel + 1);
        assert!(create_tag < add_slug);
        assert!(add_slug < slug_index);
        assert!(plan.skipped_destructive.is_empty());
        assert!(plan.warnings.is_empty());
    }

    /// 定義の巻き戻しは破壊的変更として保留されることを確認
    #[test]
    fn test_rollback_is_destructive() {
        let old = reflect(&registry_v2());
        let new = reflect(&registry_v1());

        let gated = plan(Dialect::MySQL, &old, &new, false);
        assert!(gated.statements.is_empty());
        assert!(gated
            .skipped_destructive
            .contains(&"DROP INDEX `uniq_node_slug` ON `node`".to_string()));
        assert!(gated
            .skipped_destructive
            .contains(&"ALTER TABLE `node` DROP COLUMN `slug`".to_string()));
        assert!(gated
            .skipped_destructive
            .contains(&"DROP TABLE `node_rel`".to_string()));
        assert!(gated.skipped_destructive.contains(&"DROP TABLE `tag`".to_string()));

        let allowed = plan(Dialect::MySQL, &old, &new, true);
        assert!(allowed.skipped_destructive.is_empty());
        assert_eq!(allowed.statements.len(), gated.skipped_destructive.len());
        assert!(
            position(&allowed, "DROP INDEX `uniq_node_slug`")
                < position(&allowed, "ALTER TABLE `node` DROP COLUMN `slug`")
        );
    }

    /// 型の変更はMySQLではMODIFY、SQLiteでは警告になることを確認
    #[test]
    fn test_column_change_per_dialect() {
        let old = reflect(&registry_v1());
        let widened = ModelRegistry::new();
        widened
            .register_model(
                ModelDefinition::new("Node")
                    .with_field(Field::new("title", FieldType::String).with_length(200))
                    .with_field(Field::new("views", FieldType::Integer).unsigned().with_default(0)),
            )
            .unwrap();
        let new = reflect(&widened);

        let mysql = plan(Dialect::MySQL, &old, &new, false);
        assert_eq!(
            mysql.statements,
            vec!["ALTER TABLE `node` MODIFY COLUMN `title` VARCHAR(200)".to_string()]
        );

        let sqlite = plan(Dialect::SQLite, &old, &new, false);
        assert!(sqlite.statements.is_empty());
        assert_eq!(sqlite.warnings.len(), 1);
        assert!(sqlite.warnings[0].contains("'node.title'"));
    }

    /// テーブル名のプレフィックスが全ての名前に反映されることを確認
    #[test]
    fn test_table_prefix() {
        let registry = registry_v2();
        let reflected = SchemaReflector::new("app_").reflect(&registry.get_models(), &registry);
        let plan = plan(Dialect::SQLite, &Schema::new(), &reflected.schema, false);

        assert!(plan
            .statements
            .iter()
            .any(|sql| sql.starts_with("CREATE TABLE \"app_node_rel\"")));
        assert!(plan.statements.contains(
            &"CREATE UNIQUE INDEX \"uniq_app_node_slug\" ON \"app_node\" (\"slug\")".to_string()
        ));
    }
}
