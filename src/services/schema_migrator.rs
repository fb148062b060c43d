// スキーママイグレーションサービス
//
// モデル定義の反映、データベースの現状取得、差分検出、計画生成、実行を順に行います。
// Storageプラグインは方言ごとの取得と実行のみを担当します。

use crate::adapters::storage::Storage;
use crate::core::error::StorageError;
use crate::core::migration::{MigrationOptions, MigrationPlan, MigrationReport};
use crate::core::model::{ModelCatalog, ModelDefinition};
use crate::core::naming;
use crate::core::schema::Schema;
use crate::services::migration_generator::MigrationGenerator;
use crate::services::schema_diff_detector::SchemaDiffDetector;
use crate::services::schema_reflector::SchemaReflector;
use chrono::Utc;
use std::collections::HashSet;
use tracing::{info, warn};

/// スキーママイグレーションサービス
#[derive(Debug, Clone, Default)]
pub struct SchemaMigrator {}

impl SchemaMigrator {
    /// 新しいSchemaMigratorを作成
    pub fn new() -> Self {
        Self {}
    }

    /// ストレージのスキーマをモデル定義に合わせる
    ///
    /// # Arguments
    ///
    /// * `storage` - 対象ストレージ
    /// * `models` - このストレージに保存されるモデル定義
    /// * `catalog` - 登録済みの全モデル定義
    /// * `options` - dry run と破壊的変更の許可
    ///
    /// # Returns
    ///
    /// 実行結果（dry runの場合は実行予定のSQL）
    pub async fn migrate(
        &self,
        storage: &dyn Storage,
        models: &[ModelDefinition],
        catalog: &dyn ModelCatalog,
        options: MigrationOptions,
    ) -> Result<MigrationReport, StorageError> {
        let started_at = Utc::now();

        let current = storage.introspect().await?;
        let plan = self.plan(storage, models, catalog, &current, options.allow_destructive)?;

        for message in &plan.warnings {
            warn!(storage = %storage.name(), "{}", message);
        }

        if options.dry_run {
            info!(
                storage = %storage.name(),
                statements = plan.statements.len(),
                "Dry run: migration not applied"
            );
        } else if !plan.is_empty() {
            storage.migrate(&plan).await?;
        }

        Ok(MigrationReport::from_plan(
            storage.name(),
            plan,
            options.dry_run,
            started_at,
        ))
    }

    /// 現在のスキーマからマイグレーション計画を作成
    ///
    /// 登録済みモデルのどれにも属さないテーブルは、テーブル名のプレフィックスが
    /// 一致する場合のみ削除対象として扱います。
    pub fn plan(
        &self,
        storage: &dyn Storage,
        models: &[ModelDefinition],
        catalog: &dyn ModelCatalog,
        current: &Schema,
        allow_destructive: bool,
    ) -> Result<MigrationPlan, StorageError> {
        let dialect = storage
            .dialect()
            .ok_or_else(|| storage.unsupported("migrations"))?;
        let prefix = storage.table_prefix();

        let reflected = SchemaReflector::new(prefix).reflect(models, catalog);
        let foreign_tables = foreign_tables(prefix, models, catalog);

        let mut relevant = Schema::new();
        for (name, table) in &current.tables {
            let owned = reflected.schema.has_table(name);
            let orphaned = name.starts_with(prefix) && !foreign_tables.contains(name);
            if owned || orphaned {
                relevant.add_table(table.clone());
            }
        }

        let diff = SchemaDiffDetector::new(dialect).detect_diff(&relevant, &reflected.schema);
        let mut plan = MigrationGenerator::new(dialect).generate(&diff, allow_destructive);
        let mut warnings = reflected.warnings;
        warnings.append(&mut plan.warnings);
        plan.warnings = warnings;

        Ok(plan)
    }
}

/// 他のストレージに属する登録済みモデルのテーブル名
fn foreign_tables(
    prefix: &str,
    models: &[ModelDefinition],
    catalog: &dyn ModelCatalog,
) -> HashSet<String> {
    let own: HashSet<&str> = models.iter().map(|m| m.name.as_str()).collect();
    catalog
        .model_names()
        .into_iter()
        .filter(|name| !own.contains(name.as_str()))
        .flat_map(|name| {
            [
                naming::table_name(prefix, &name),
                naming::relation_table_name(prefix, &name),
            ]
        })
        .collect()
}
