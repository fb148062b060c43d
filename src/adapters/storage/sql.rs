// SQLストレージ
//
// sqlx の AnyPool を使用してモデルをリレーショナルデータベースに永続化します。
// MySQL と SQLite に対応し、方言の違いはクエリビルダーとSQLジェネレーターが吸収します。

use crate::adapters::database::DatabaseConnectionService;
use crate::adapters::database_introspector::{create_introspector, introspect_schema};
use crate::adapters::query_builder::{CompareOp, SqlQueryBuilder};
use crate::adapters::row_codec::{build_query, coerce_to_field, row_to_map};
use crate::adapters::storage::filters::{FilterFn, FilterRegistry};
use crate::adapters::storage::{QueryOutcome, Storage};
use crate::core::config::{Dialect, StorageConfig};
use crate::core::error::{DatabaseError, PluginError, QueryError, StorageError};
use crate::core::field::Field;
use crate::core::migration::MigrationPlan;
use crate::core::model::{Model, ModelCatalog, ModelDefinition};
use crate::core::naming::{self, ID_FIELD};
use crate::core::query::{JoinKind, Query, QueryType};
use crate::core::schema::Schema;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{AnyPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// SQLストレージ
pub struct SqlStorage {
    name: String,
    config: StorageConfig,
    catalog: Arc<dyn ModelCatalog>,
    filters: FilterRegistry,
    pool: OnceCell<AnyPool>,
}

impl std::fmt::Debug for SqlStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlStorage")
            .field("name", &self.name)
            .field("dialect", &self.config.dialect)
            .field("database", &self.config.database)
            .field("connected", &self.pool.initialized())
            .finish()
    }
}

impl SqlStorage {
    /// 新しいSqlStorageを作成
    ///
    /// 接続は最初のクエリ実行時（または `connect` 呼び出し時）に確立されます。
    ///
    /// # Arguments
    ///
    /// * `name` - プラグイン名
    /// * `config` - ストレージ設定
    /// * `catalog` - モデル定義の参照元
    pub fn new(
        name: impl Into<String>,
        config: StorageConfig,
        catalog: Arc<dyn ModelCatalog>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            catalog,
            filters: FilterRegistry::with_builtin_filters(),
            pool: OnceCell::new(),
        }
    }

    /// 既存の接続プールを使用してSqlStorageを作成
    pub fn with_pool(
        name: impl Into<String>,
        config: StorageConfig,
        catalog: Arc<dyn ModelCatalog>,
        pool: AnyPool,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            catalog,
            filters: FilterRegistry::with_builtin_filters(),
            pool: OnceCell::new_with(Some(pool)),
        }
    }

    /// ストレージ設定を取得
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// フィルターを登録（同名のフィルターは上書きしない）
    pub fn add_filter(&mut self, name: impl Into<String>, filter: FilterFn) -> bool {
        self.filters.add_filter(name, filter)
    }

    /// フィルター関数を取得
    pub fn get_filter(&self, name: &str) -> Option<FilterFn> {
        self.filters.get_filter(name)
    }

    /// モデルのテーブル名
    pub fn table_name(&self, model_name: &str) -> String {
        naming::table_name(&self.config.table_prefix, model_name)
    }

    /// モデルのリレーションテーブル名
    pub fn relation_table_name(&self, model_name: &str) -> String {
        naming::relation_table_name(&self.config.table_prefix, model_name)
    }

    /// 接続プールを取得（未接続なら接続）
    async fn pool(&self) -> Result<&AnyPool, StorageError> {
        let pool = self
            .pool
            .get_or_try_init(|| async {
                DatabaseConnectionService::new()
                    .create_pool(&self.config)
                    .await
            })
            .await?;
        Ok(pool)
    }

    fn definition(&self, model_name: &str) -> Result<ModelDefinition, StorageError> {
        self.catalog
            .model_definition(model_name)
            .ok_or_else(|| PluginError::model_not_registered(model_name).into())
    }

    fn relation_field(
        &self,
        definition: &ModelDefinition,
        field_name: &str,
    ) -> Result<Field, StorageError> {
        definition
            .get_field(field_name)
            .filter(|field| field.is_relation() && field.relation_model.is_some())
            .cloned()
            .ok_or_else(|| StorageError::InvalidData {
                model: definition.name.clone(),
                message: format!("'{}' is not a relation field", field_name),
            })
    }

    fn log_sql(&self, sql: &str, params: &[Value]) {
        if self.config.debug_sql {
            info!(storage = %self.name, sql = %sql, params = ?params, "SQL");
        } else {
            debug!(storage = %self.name, sql = %sql, params = ?params, "SQL");
        }
    }

    /// 汎用クエリをSQLクエリビルダーに変換
    ///
    /// INSERTではNULLの値を、UPDATEでは `id` を除外します。
    /// モデル定義にないフィールドやリレーションフィールドは書き込み対象になりません。
    pub fn translate_query(
        &self,
        definition: &ModelDefinition,
        query: &Query,
    ) -> Result<SqlQueryBuilder, QueryError> {
        let table = self.table_name(&definition.name);
        let mut builder = SqlQueryBuilder::new(self.config.dialect);

        let writable = |name: &str| {
            definition
                .get_field(name)
                .is_some_and(|field| !field.is_relation())
        };

        match query.query_type() {
            QueryType::Insert => {
                builder.insert_into(&table)?;
                for (name, value) in query.data() {
                    if writable(name) && !value.is_null() {
                        builder.value(name, value.clone())?;
                    }
                }
                // INSERTにフィルターは適用しない
                return Ok(builder);
            }
            QueryType::Select | QueryType::Count => {
                let all_columns = format!("{}.*", table);
                builder.from(&table, None)?;
                builder.select(&[all_columns.as_str()])?;
            }
            QueryType::Update => {
                builder.update(&table)?;
                for (name, value) in query.data() {
                    if name != ID_FIELD && writable(name) {
                        builder.set(name, value.clone())?;
                    }
                }
            }
            QueryType::Delete => {
                builder.delete(&table)?;
            }
        }

        let counting = query.query_type() == QueryType::Count;
        for filter in query.filters() {
            // 件数取得では並び順と取得範囲を無視する
            if counting && matches!(filter.name.as_str(), "limit" | "order") {
                continue;
            }
            self.filters.apply(&mut builder, filter)?;
        }

        if counting && !query.has_filter("count") {
            builder.select_count(&format!("{}.{}", table, ID_FIELD))?;
        }

        Ok(builder)
    }

    fn rows_to_models(&self, definition: &ModelDefinition, rows: &[sqlx::any::AnyRow]) -> Vec<Model> {
        rows.iter()
            .map(|row| {
                let data = row_to_map(row)
                    .into_iter()
                    .map(|(name, value)| {
                        let value = match definition.get_field(&name) {
                            Some(field) => coerce_to_field(field, value),
                            None => value,
                        };
                        (name, value)
                    })
                    .collect();
                Model::with_data(&definition.name, data)
            })
            .collect()
    }

    async fn execute_builder(
        &self,
        builder: &SqlQueryBuilder,
    ) -> Result<sqlx::any::AnyQueryResult, StorageError> {
        let (sql, params) = builder.to_sql()?;
        self.log_sql(&sql, &params);
        let pool = self.pool().await?;
        build_query(&sql, &params)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::query(e.to_string(), &sql).into())
    }
}

#[async_trait]
impl Storage for SqlStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn dialect(&self) -> Option<Dialect> {
        Some(self.config.dialect)
    }

    fn table_prefix(&self) -> &str {
        &self.config.table_prefix
    }

    fn filters(&self) -> Vec<String> {
        self.filters.names()
    }

    fn has_filter(&self, name: &str) -> bool {
        self.filters.has_filter(name)
    }

    async fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    async fn connect(&self) -> Result<(), StorageError> {
        self.pool().await.map(|_| ())
    }

    async fn execute_query(&self, query: &Query) -> Result<QueryOutcome, StorageError> {
        let model_name = query.model().ok_or_else(|| QueryError::Incomplete {
            message: "query has no model".to_string(),
        })?;
        let definition = self.definition(model_name)?;
        let builder = self.translate_query(&definition, query)?;

        match query.query_type() {
            QueryType::Select => {
                let (sql, params) = builder.to_sql()?;
                self.log_sql(&sql, &params);
                let pool = self.pool().await?;
                let rows = build_query(&sql, &params)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| DatabaseError::query(e.to_string(), &sql))?;
                Ok(QueryOutcome::Models(self.rows_to_models(&definition, &rows)))
            }
            QueryType::Count => {
                let (sql, params) = builder.to_sql()?;
                self.log_sql(&sql, &params);
                let pool = self.pool().await?;
                let row = build_query(&sql, &params)
                    .fetch_one(pool)
                    .await
                    .map_err(|e| DatabaseError::query(e.to_string(), &sql))?;
                let count: i64 = row
                    .try_get(0)
                    .map_err(|e| DatabaseError::query(e.to_string(), &sql))?;
                Ok(QueryOutcome::Count(count.max(0) as u64))
            }
            QueryType::Insert => {
                let result = self.execute_builder(&builder).await?;
                Ok(QueryOutcome::Inserted {
                    id: result.last_insert_id(),
                })
            }
            QueryType::Update | QueryType::Delete => {
                let result = self.execute_builder(&builder).await?;
                Ok(QueryOutcome::Affected(result.rows_affected()))
            }
        }
    }

    async fn load_relation(
        &self,
        instance: &Model,
        field_name: &str,
    ) -> Result<Vec<Model>, StorageError> {
        let definition = self.definition(instance.model_name())?;
        let field = self.relation_field(&definition, field_name)?;
        let Some(id) = instance.id() else {
            return Ok(Vec::new());
        };
        let related_model = field.relation_model.clone().unwrap_or_default();

        let related_table = self.table_name(&related_model);
        let relation_table = self.relation_table_name(&definition.name);
        let owner_column = format!(
            "{}.{}",
            relation_table,
            naming::owner_id_column(&definition.name)
        );
        let related_column = format!(
            "{}.{}",
            relation_table,
            naming::relation_id_column(field_name)
        );

        let related_columns = format!("{}.*", related_table);
        let mut query = Query::new()
            .select(&[related_columns.as_str()])
            .join(
                JoinKind::Inner,
                &relation_table,
                &related_column,
                &format!("{}.{}", related_table, ID_FIELD),
            )
            .equal(&owner_column, id.clone());
        if field.is_single_relation() {
            query = query.limit(0, 1);
        }

        self.load(&related_model, Some(query)).await
    }

    async fn add_relation(
        &self,
        instance: &Model,
        field_name: &str,
        related: &Model,
    ) -> Result<(), StorageError> {
        let definition = self.definition(instance.model_name())?;
        let field = self.relation_field(&definition, field_name)?;
        let (owner_id, related_id) = relation_ids(&definition, instance, related)?;

        let relation_table = self.relation_table_name(&definition.name);
        let owner_column = naming::owner_id_column(&definition.name);
        let related_column = naming::relation_id_column(field_name);

        if field.is_single_relation() {
            // 単一値のリレーションは既存の関連を置き換える
            let mut delete = SqlQueryBuilder::new(self.config.dialect);
            delete.delete(&relation_table)?;
            delete.and_where_compare(&owner_column, CompareOp::Eq, owner_id.clone())?;
            delete.and_where_compare(&related_column, CompareOp::Neq, Value::Null)?;
            self.execute_builder(&delete).await?;
        } else {
            let mut exists = SqlQueryBuilder::new(self.config.dialect);
            exists.from(&relation_table, None)?;
            exists.select_count(&owner_column)?;
            exists.and_where_compare(&owner_column, CompareOp::Eq, owner_id.clone())?;
            exists.and_where_compare(&related_column, CompareOp::Eq, related_id.clone())?;
            let (sql, params) = exists.to_sql()?;
            self.log_sql(&sql, &params);
            let row = build_query(&sql, &params)
                .fetch_one(self.pool().await?)
                .await
                .map_err(|e| DatabaseError::query(e.to_string(), &sql))?;
            let count: i64 = row
                .try_get(0)
                .map_err(|e| DatabaseError::query(e.to_string(), &sql))?;
            if count > 0 {
                return Ok(());
            }
        }

        let mut insert = SqlQueryBuilder::new(self.config.dialect);
        insert.insert_into(&relation_table)?;
        insert.value(&owner_column, owner_id)?;
        insert.value(&related_column, related_id)?;
        self.execute_builder(&insert).await?;
        Ok(())
    }

    async fn remove_relation(
        &self,
        instance: &Model,
        field_name: &str,
        related: &Model,
    ) -> Result<u64, StorageError> {
        let definition = self.definition(instance.model_name())?;
        self.relation_field(&definition, field_name)?;
        let (owner_id, related_id) = relation_ids(&definition, instance, related)?;

        let mut delete = SqlQueryBuilder::new(self.config.dialect);
        delete.delete(&self.relation_table_name(&definition.name))?;
        delete.and_where_compare(
            &naming::owner_id_column(&definition.name),
            CompareOp::Eq,
            owner_id,
        )?;
        delete.and_where_compare(
            &naming::relation_id_column(field_name),
            CompareOp::Eq,
            related_id,
        )?;
        let result = self.execute_builder(&delete).await?;
        Ok(result.rows_affected())
    }

    async fn introspect(&self) -> Result<Schema, StorageError> {
        let pool = self.pool().await?;
        let introspector = create_introspector(self.config.dialect);
        Ok(introspect_schema(introspector.as_ref(), pool).await?)
    }

    async fn migrate(&self, plan: &MigrationPlan) -> Result<(), StorageError> {
        if plan.dialect != self.config.dialect {
            return Err(DatabaseError::Unsupported {
                dialect: self.config.dialect.to_string(),
                message: format!("migration plan was generated for {}", plan.dialect),
            }
            .into());
        }

        let pool = self.pool().await?;
        for statement in &plan.statements {
            self.log_sql(statement, &[]);
            sqlx::query(statement)
                .execute(pool)
                .await
                .map_err(|e| DatabaseError::query(e.to_string(), statement))?;
        }
        info!(storage = %self.name, statements = plan.statements.len(), "Migration applied");
        Ok(())
    }
}

/// 関連の両端のIDを取得（どちらかが未保存ならエラー）
fn relation_ids(
    definition: &ModelDefinition,
    instance: &Model,
    related: &Model,
) -> Result<(Value, Value), StorageError> {
    match (instance.id(), related.id()) {
        (Some(owner_id), Some(related_id)) => Ok((owner_id.clone(), related_id.clone())),
        _ => Err(StorageError::InvalidData {
            model: definition.name.clone(),
            message: "both instances must be saved before they can be related".to_string(),
        }),
    }
}
