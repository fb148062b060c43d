// ストレージアダプター
//
// モデルの永続化を担うStorageプラグインのインターフェースと、SQL実装を提供します。
// 汎用クエリは登録済みのフィルターによってバックエンド固有の操作に変換されます。

pub mod filters;
pub mod sql;

pub use filters::{FilterFn, FilterRegistry};
pub use sql::SqlStorage;

use crate::core::config::Dialect;
use crate::core::error::StorageError;
use crate::core::migration::MigrationPlan;
use crate::core::model::Model;
use crate::core::naming::ID_FIELD;
use crate::core::query::{Query, QueryType};
use crate::core::schema::Schema;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// クエリの実行結果
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// SELECTで取得したインスタンス
    Models(Vec<Model>),
    /// COUNTの結果
    Count(u64),
    /// UPDATE/DELETEで影響を受けた行数
    Affected(u64),
    /// INSERTの結果（生成されたID）
    Inserted { id: Option<i64> },
}

fn unexpected_outcome(model: &str, query_type: QueryType, outcome: &QueryOutcome) -> StorageError {
    StorageError::InvalidData {
        model: model.to_string(),
        message: format!("unexpected result for {} query: {:?}", query_type, outcome),
    }
}

/// 種別とモデルを設定したクエリを作成
fn prepare(model: &str, query: Option<Query>, query_type: QueryType) -> Query {
    let mut query = query.unwrap_or_default();
    query.set_type(query_type);
    query.set_model(model);
    query
}

/// Storageプラグインのインターフェース
///
/// 実装が必須なのは接続管理と `execute_query` のみで、
/// CRUD操作はクエリを組み立てて `execute_query` に委譲します。
#[async_trait]
pub trait Storage: Send + Sync {
    /// プラグイン名
    fn name(&self) -> &str;

    /// SQL方言（SQL以外のストレージは None）
    fn dialect(&self) -> Option<Dialect> {
        None
    }

    /// テーブル名のプレフィックス
    fn table_prefix(&self) -> &str {
        ""
    }

    /// 登録済みのフィルター名
    fn filters(&self) -> Vec<String>;

    /// フィルターが登録されているか確認
    fn has_filter(&self, name: &str) -> bool {
        self.filters().iter().any(|f| f == name)
    }

    /// 接続済みかどうか
    async fn is_connected(&self) -> bool;

    /// 接続を確立
    async fn connect(&self) -> Result<(), StorageError>;

    /// クエリを実行
    async fn execute_query(&self, query: &Query) -> Result<QueryOutcome, StorageError>;

    /// 条件に一致するインスタンス数
    async fn count(&self, model: &str, query: Option<Query>) -> Result<u64, StorageError> {
        let query = prepare(model, query, QueryType::Count);
        match self.execute_query(&query).await? {
            QueryOutcome::Count(count) => Ok(count),
            other => Err(unexpected_outcome(model, QueryType::Count, &other)),
        }
    }

    /// インスタンスが保存済みかどうか
    ///
    /// IDが空の場合は問い合わせずに false を返します。
    async fn exists(&self, model: &str, instance: &Model) -> Result<bool, StorageError> {
        let Some(id) = instance.id() else {
            return Ok(false);
        };
        let query = Query::new().equal(ID_FIELD, id.clone());
        Ok(self.count(model, Some(query)).await? > 0)
    }

    /// インスタンスを保存
    ///
    /// 未保存ならINSERTして生成されたIDを設定し、保存済みならそのIDの行のみをUPDATEします。
    async fn save(&self, model: &str, instance: &mut Model) -> Result<bool, StorageError> {
        if self.exists(model, instance).await? {
            let data: BTreeMap<String, Value> = instance
                .to_map()
                .iter()
                .filter(|(name, _)| name.as_str() != ID_FIELD)
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            if data.is_empty() {
                return Ok(true);
            }

            let id = instance.id().cloned().unwrap_or(Value::Null);
            let mut query = prepare(model, Some(Query::new().equal(ID_FIELD, id)), QueryType::Update);
            query.set_data(data);
            return match self.execute_query(&query).await? {
                QueryOutcome::Affected(_) => Ok(true),
                other => Err(unexpected_outcome(model, QueryType::Update, &other)),
            };
        }

        let mut query = prepare(model, None, QueryType::Insert);
        query.set_data(instance.to_map().clone());
        match self.execute_query(&query).await? {
            QueryOutcome::Inserted { id } => {
                if let Some(id) = id {
                    instance.set_id(id);
                }
                Ok(true)
            }
            other => Err(unexpected_outcome(model, QueryType::Insert, &other)),
        }
    }

    /// インスタンスを読み込み
    async fn load(&self, model: &str, query: Option<Query>) -> Result<Vec<Model>, StorageError> {
        let query = prepare(model, query, QueryType::Select);
        match self.execute_query(&query).await? {
            QueryOutcome::Models(models) => Ok(models),
            other => Err(unexpected_outcome(model, QueryType::Select, &other)),
        }
    }

    /// 条件に一致するインスタンスを一括更新
    async fn update(
        &self,
        model: &str,
        query: Option<Query>,
        data: BTreeMap<String, Value>,
    ) -> Result<u64, StorageError> {
        let mut query = prepare(model, query, QueryType::Update);
        query.set_data(data);
        match self.execute_query(&query).await? {
            QueryOutcome::Affected(rows) => Ok(rows),
            other => Err(unexpected_outcome(model, QueryType::Update, &other)),
        }
    }

    /// 条件に一致するインスタンスを削除
    async fn delete(&self, model: &str, query: Option<Query>) -> Result<u64, StorageError> {
        let query = prepare(model, query, QueryType::Delete);
        match self.execute_query(&query).await? {
            QueryOutcome::Affected(rows) => Ok(rows),
            other => Err(unexpected_outcome(model, QueryType::Delete, &other)),
        }
    }

    /// リレーションフィールドの関連インスタンスを読み込み
    ///
    /// 単一値のリレーションは最大1件を返します。
    async fn load_relation(
        &self,
        _instance: &Model,
        _field: &str,
    ) -> Result<Vec<Model>, StorageError> {
        Err(self.unsupported("relations"))
    }

    /// 関連を追加
    async fn add_relation(
        &self,
        _instance: &Model,
        _field: &str,
        _related: &Model,
    ) -> Result<(), StorageError> {
        Err(self.unsupported("relations"))
    }

    /// 関連を削除
    async fn remove_relation(
        &self,
        _instance: &Model,
        _field: &str,
        _related: &Model,
    ) -> Result<u64, StorageError> {
        Err(self.unsupported("relations"))
    }

    /// 現在のスキーマを取得
    async fn introspect(&self) -> Result<Schema, StorageError> {
        Err(self.unsupported("schema introspection"))
    }

    /// マイグレーション計画を実行
    async fn migrate(&self, _plan: &MigrationPlan) -> Result<(), StorageError> {
        Err(self.unsupported("migrations"))
    }

    /// 未サポート操作のエラーを作成
    fn unsupported(&self, operation: &str) -> StorageError {
        StorageError::Unsupported {
            storage: self.name().to_string(),
            operation: operation.to_string(),
        }
    }
}
