// モデルファクトリー
//
// モデルのCRUD操作を実行します。各操作はパーミッションを確認してから
// Before* イベントを発行し、ストレージでの処理後に完了イベントを発行します。

use crate::core::error::{AccessDeniedError, FluxError};
use crate::core::event::{ModelEvent, ModelEventKind};
use crate::core::model::{Model, ModelDefinition};
use crate::core::naming::ID_FIELD;
use crate::core::permission::ModelAction;
use crate::core::query::Query;
use crate::services::event_dispatcher::EventDispatcher;
use crate::services::model_registry::ModelRegistry;
use crate::services::permissions::PermissionService;
use crate::services::storage_factory::StorageFactory;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// モデルファクトリー
#[derive(Debug, Clone)]
pub struct ModelFactory {
    registry: Arc<ModelRegistry>,
    permissions: Arc<PermissionService>,
    dispatcher: Arc<EventDispatcher>,
    storages: Arc<StorageFactory>,
}

impl ModelFactory {
    /// 新しいModelFactoryを作成
    pub fn new(
        registry: Arc<ModelRegistry>,
        permissions: Arc<PermissionService>,
        dispatcher: Arc<EventDispatcher>,
        storages: Arc<StorageFactory>,
    ) -> Self {
        Self {
            registry,
            permissions,
            dispatcher,
            storages,
        }
    }

    /// 操作の可否を確認し、モデル定義を取得
    fn authorize(
        &self,
        model_name: &str,
        instance: Option<&Model>,
        action: ModelAction,
    ) -> Result<ModelDefinition, FluxError> {
        if !self
            .permissions
            .has_model_access(model_name, instance, action)
        {
            return Err(AccessDeniedError::new(format!(
                "You are not allowed to {} {} models.",
                action, model_name
            ))
            .into());
        }

        Ok(self.registry.get_model(model_name)?)
    }

    fn authorize_relation_write(&self, instance: &Model, related: &Model) -> Result<(), FluxError> {
        self.authorize(instance.model_name(), Some(instance), ModelAction::Save)?;
        self.authorize(related.model_name(), Some(related), ModelAction::Save)?;
        Ok(())
    }

    fn fire(&self, kind: ModelEventKind, model_name: &str, query: Option<&Query>) {
        self.dispatcher
            .dispatch(&ModelEvent::new(kind, model_name).with_query(query));
    }

    fn fire_instance(&self, kind: ModelEventKind, model_name: &str, instance: &Model) {
        self.dispatcher
            .dispatch(&ModelEvent::new(kind, model_name).with_instance(instance));
    }

    /// インスタンスを作成（保存はしない）
    ///
    /// # Arguments
    ///
    /// * `model_name` - モデル名
    /// * `data` - 初期データ（フィールドの既定値を上書き）
    /// * `is_new` - 新規インスタンスとして作成するか（trueの場合は `id` を無視）
    pub fn create(
        &self,
        model_name: &str,
        mut data: BTreeMap<String, Value>,
        is_new: bool,
    ) -> Result<Model, FluxError> {
        let definition = self.authorize(model_name, None, ModelAction::Create)?;
        self.fire(ModelEventKind::BeforeCreate, model_name, None);

        if is_new {
            data.remove(ID_FIELD);
        }
        let instance = definition.instantiate(data);

        self.fire_instance(ModelEventKind::Create, model_name, &instance);
        Ok(instance)
    }

    /// インスタンスを読み込み
    pub async fn load(&self, model_name: &str, query: Option<Query>) -> Result<Vec<Model>, FluxError> {
        self.authorize(model_name, None, ModelAction::Load)?;
        self.fire(ModelEventKind::BeforeLoad, model_name, query.as_ref());

        let storage = self.storages.storage_for(model_name)?;
        let instances = storage.load(model_name, query.clone()).await?;
        debug!(
            model = %model_name,
            query = %query.as_ref().map(Query::to_hash).unwrap_or_default(),
            count = instances.len(),
            "Loaded models"
        );

        for instance in &instances {
            self.dispatcher.dispatch(
                &ModelEvent::new(ModelEventKind::Load, model_name)
                    .with_query(query.as_ref())
                    .with_instance(instance),
            );
        }
        Ok(instances)
    }

    /// 最初の1件を読み込み
    pub async fn load_first(
        &self,
        model_name: &str,
        query: Option<Query>,
    ) -> Result<Option<Model>, FluxError> {
        let query = query.unwrap_or_default().limit(0, 1);
        Ok(self
            .load(model_name, Some(query))
            .await?
            .into_iter()
            .next())
    }

    /// インスタンスを保存
    ///
    /// 全インスタンスの権限を確認してから書き込みを始めるため、
    /// 拒否されたインスタンスが1つでもあれば何も保存されません。
    /// 空のリストは何もせず false を返します。
    /// 新規インスタンスには生成されたIDが設定されます。
    pub async fn save(&self, model_name: &str, instances: &mut [Model]) -> Result<bool, FluxError> {
        self.authorize(model_name, None, ModelAction::Save)?;
        if instances.is_empty() {
            return Ok(false);
        }

        for instance in instances.iter() {
            self.authorize(model_name, Some(instance), ModelAction::Save)?;
        }
        let storage = self.storages.storage_for(model_name)?;

        for instance in instances.iter() {
            self.fire_instance(ModelEventKind::BeforeSave, model_name, instance);
        }

        let mut saved = true;
        for instance in instances.iter_mut() {
            saved &= storage.save(model_name, instance).await?;
            self.fire_instance(ModelEventKind::Save, model_name, instance);
        }
        Ok(saved)
    }

    /// 条件に一致するインスタンスを一括更新
    pub async fn update(
        &self,
        model_name: &str,
        query: Option<Query>,
        data: BTreeMap<String, Value>,
    ) -> Result<u64, FluxError> {
        self.authorize(model_name, None, ModelAction::Update)?;
        self.fire(ModelEventKind::BeforeUpdate, model_name, query.as_ref());

        let storage = self.storages.storage_for(model_name)?;
        let rows = storage.update(model_name, query.clone(), data).await?;

        self.fire(ModelEventKind::Update, model_name, query.as_ref());
        Ok(rows)
    }

    /// 条件に一致するインスタンスを削除
    pub async fn delete(&self, model_name: &str, query: Option<Query>) -> Result<u64, FluxError> {
        self.authorize(model_name, None, ModelAction::Delete)?;
        self.fire(ModelEventKind::BeforeDelete, model_name, query.as_ref());

        let storage = self.storages.storage_for(model_name)?;
        let rows = storage.delete(model_name, query.clone()).await?;

        self.fire(ModelEventKind::Delete, model_name, query.as_ref());
        Ok(rows)
    }

    /// リレーションフィールドの関連インスタンスを読み込み
    ///
    /// 所有モデルと関連モデルの両方に読み込み権限が必要です。
    pub async fn load_relation(&self, instance: &Model, field: &str) -> Result<Vec<Model>, FluxError> {
        let definition = self.authorize(instance.model_name(), Some(instance), ModelAction::Load)?;
        if let Some(related) = definition
            .get_field(field)
            .and_then(|f| f.relation_model.as_deref())
        {
            self.authorize(related, None, ModelAction::Load)?;
        }

        let storage = self.storages.storage_for(instance.model_name())?;
        Ok(storage.load_relation(instance, field).await?)
    }

    /// 関連を追加
    ///
    /// 所有モデルと関連モデルの両方に保存権限が必要です。
    pub async fn add_relation(
        &self,
        instance: &Model,
        field: &str,
        related: &Model,
    ) -> Result<(), FluxError> {
        self.authorize_relation_write(instance, related)?;
        let storage = self.storages.storage_for(instance.model_name())?;
        Ok(storage.add_relation(instance, field, related).await?)
    }

    /// 関連を削除
    pub async fn remove_relation(
        &self,
        instance: &Model,
        field: &str,
        related: &Model,
    ) -> Result<u64, FluxError> {
        self.authorize_relation_write(instance, related)?;
        let storage = self.storages.storage_for(instance.model_name())?;
        Ok(storage.remove_relation(instance, field, related).await?)
    }
}
