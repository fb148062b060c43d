// ストレージファクトリー
//
// モデルごとに使用するStorageプラグインを解決し、インスタンスを共有します。

use crate::adapters::storage::Storage;
use crate::core::config::StorageConfig;
use crate::core::error::PluginError;
use crate::services::model_registry::ModelRegistry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// ストレージファクトリー
pub struct StorageFactory {
    registry: Arc<ModelRegistry>,
    config: StorageConfig,
    model_storages: HashMap<String, String>,
    instances: Mutex<BTreeMap<String, Arc<dyn Storage>>>,
}

impl std::fmt::Debug for StorageFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageFactory")
            .field("default", &self.config.plugin)
            .field("model_storages", &self.model_storages)
            .finish()
    }
}

impl StorageFactory {
    /// 新しいStorageFactoryを作成
    ///
    /// # Arguments
    ///
    /// * `registry` - Storageプラグインとモデル定義のレジストリ
    /// * `config` - ストレージ設定（`plugin` が既定のプラグイン）
    /// * `model_storages` - モデル名 -> プラグイン名 の上書き
    pub fn new(
        registry: Arc<ModelRegistry>,
        config: StorageConfig,
        model_storages: HashMap<String, String>,
    ) -> Self {
        Self {
            registry,
            config,
            model_storages,
            instances: Mutex::new(BTreeMap::new()),
        }
    }

    /// モデルが使用するStorageプラグイン名
    pub fn plugin_name(&self, model_name: &str) -> &str {
        self.model_storages
            .get(model_name)
            .map(String::as_str)
            .unwrap_or(&self.config.plugin)
    }

    /// モデルのストレージを取得
    pub fn storage_for(&self, model_name: &str) -> Result<Arc<dyn Storage>, PluginError> {
        self.storage(self.plugin_name(model_name))
    }

    /// プラグイン名からストレージを取得（初回のみ作成）
    pub fn storage(&self, plugin_name: &str) -> Result<Arc<dyn Storage>, PluginError> {
        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(storage) = instances.get(plugin_name) {
            return Ok(storage.clone());
        }

        let constructor = self.registry.get_storage(plugin_name)?;
        let storage = constructor(plugin_name, self.config.clone(), self.registry.clone());
        debug!(storage = %plugin_name, "Created storage");
        instances.insert(plugin_name.to_string(), storage.clone());
        Ok(storage)
    }

    /// 登録済みモデルをストレージごとにまとめる（プラグイン名順）
    pub fn models_by_storage(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for model in self.registry.models() {
            grouped
                .entry(self.plugin_name(&model).to_string())
                .or_default()
                .push(model);
        }
        grouped
    }
}
