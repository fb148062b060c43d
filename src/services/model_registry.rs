// モデルレジストリ
//
// Modelプラグイン（モデル定義）、モデル拡張、Storageプラグインを名前で管理します。
// 登録されていないプラグインの取得は PluginError::NotRegistered になります。

use crate::adapters::storage::{SqlStorage, Storage};
use crate::core::config::{Dialect, StorageConfig};
use crate::core::error::PluginError;
use crate::core::field::Field;
use crate::core::model::{ModelCatalog, ModelDefinition};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Storageプラグインのコンストラクター
///
/// プラグイン名、ストレージ設定、モデル定義の参照元からストレージを作成します。
pub type StorageConstructor = fn(&str, StorageConfig, Arc<dyn ModelCatalog>) -> Arc<dyn Storage>;

/// MySQL用の組み込みStorageプラグイン名
pub const MYSQL_STORAGE: &str = "MySql";

/// SQLite用の組み込みStorageプラグイン名
pub const SQLITE_STORAGE: &str = "Sqlite";

fn mysql_storage(
    name: &str,
    mut config: StorageConfig,
    catalog: Arc<dyn ModelCatalog>,
) -> Arc<dyn Storage> {
    config.dialect = Dialect::MySQL;
    Arc::new(SqlStorage::new(name, config, catalog))
}

fn sqlite_storage(
    name: &str,
    mut config: StorageConfig,
    catalog: Arc<dyn ModelCatalog>,
) -> Arc<dyn Storage> {
    config.dialect = Dialect::SQLite;
    Arc::new(SqlStorage::new(name, config, catalog))
}

/// モデルレジストリ
#[derive(Default)]
pub struct ModelRegistry {
    models: RwLock<BTreeMap<String, ModelDefinition>>,
    extensions: RwLock<BTreeMap<String, Vec<Field>>>,
    storages: RwLock<BTreeMap<String, StorageConstructor>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.models())
            .field("storages", &self.storages())
            .finish()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl ModelRegistry {
    /// 空のレジストリを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 組み込みのStorageプラグイン（MySql, Sqlite）を登録したレジストリを作成
    pub fn with_builtin_storages() -> Self {
        let registry = Self::new();
        write(&registry.storages).insert(MYSQL_STORAGE.to_string(), mysql_storage);
        write(&registry.storages).insert(SQLITE_STORAGE.to_string(), sqlite_storage);
        registry
    }

    /// Modelプラグインを登録
    ///
    /// `id` フィールドがない定義には自動で追加されます。
    pub fn register_model(&self, mut definition: ModelDefinition) -> Result<(), PluginError> {
        let mut models = write(&self.models);
        if models.contains_key(&definition.name) {
            return Err(PluginError::AlreadyRegistered {
                kind: "Model".to_string(),
                name: definition.name,
            });
        }

        definition.ensure_id_field();
        debug!(model = %definition.name, fields = definition.fields.len(), "Registered model");
        models.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// モデルを拡張（フィールドを追加）
    ///
    /// 拡張は取得時に元の定義へマージされるため、モデルの登録前に拡張することもできます。
    pub fn extend_model(&self, model_name: &str, fields: Vec<Field>) {
        debug!(model = %model_name, fields = fields.len(), "Extended model");
        write(&self.extensions)
            .entry(model_name.to_string())
            .or_default()
            .extend(fields);
    }

    /// 拡張を反映したモデル定義を取得
    pub fn get_model(&self, model_name: &str) -> Result<ModelDefinition, PluginError> {
        let mut definition = read(&self.models)
            .get(model_name)
            .cloned()
            .ok_or_else(|| PluginError::model_not_registered(model_name))?;

        if let Some(fields) = read(&self.extensions).get(model_name) {
            for field in fields {
                definition.add_field(field.clone());
            }
        }

        Ok(definition)
    }

    /// 全モデル定義を取得（モデル名順）
    pub fn get_models(&self) -> Vec<ModelDefinition> {
        self.models()
            .iter()
            .filter_map(|name| self.get_model(name).ok())
            .collect()
    }

    pub fn has_model(&self, model_name: &str) -> bool {
        read(&self.models).contains_key(model_name)
    }

    /// 登録済みのモデル名（名前順）
    pub fn models(&self) -> Vec<String> {
        read(&self.models).keys().cloned().collect()
    }

    /// Storageプラグインを登録
    pub fn register_storage(
        &self,
        name: &str,
        constructor: StorageConstructor,
    ) -> Result<(), PluginError> {
        let mut storages = write(&self.storages);
        if storages.contains_key(name) {
            return Err(PluginError::AlreadyRegistered {
                kind: "Storage".to_string(),
                name: name.to_string(),
            });
        }
        storages.insert(name.to_string(), constructor);
        Ok(())
    }

    /// Storageプラグインのコンストラクターを取得
    pub fn get_storage(&self, name: &str) -> Result<StorageConstructor, PluginError> {
        read(&self.storages)
            .get(name)
            .copied()
            .ok_or_else(|| PluginError::storage_not_registered(name))
    }

    pub fn has_storage(&self, name: &str) -> bool {
        read(&self.storages).contains_key(name)
    }

    /// 登録済みのStorageプラグイン名（名前順）
    pub fn storages(&self) -> Vec<String> {
        read(&self.storages).keys().cloned().collect()
    }
}

impl ModelCatalog for ModelRegistry {
    fn model_definition(&self, model_name: &str) -> Option<ModelDefinition> {
        self.get_model(model_name).ok()
    }

    fn model_names(&self) -> Vec<String> {
        self.models()
    }
}
