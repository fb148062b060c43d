// FluxApi ファサード
//
// 設定からレジストリ、パーミッション、イベントディスパッチャー、ストレージファクトリーを組み立て、
// アプリケーションへの入口を提供します。

use crate::core::config::Config;
use crate::core::error::{FluxError, PluginError};
use crate::core::migration::{MigrationOptions, MigrationReport};
use crate::core::model::ModelDefinition;
use crate::core::permission::PermissionPlugin;
use crate::services::event_dispatcher::EventDispatcher;
use crate::services::model_factory::ModelFactory;
use crate::services::model_registry::ModelRegistry;
use crate::services::permissions::{PermissionService, RulePermission};
use crate::services::schema_migrator::SchemaMigrator;
use crate::services::storage_factory::StorageFactory;
use std::sync::Arc;
use tracing::info;

/// FluxApi ファサード
#[derive(Debug)]
pub struct FluxApi {
    config: Config,
    registry: Arc<ModelRegistry>,
    permissions: Arc<PermissionService>,
    dispatcher: Arc<EventDispatcher>,
    storages: Arc<StorageFactory>,
    models: ModelFactory,
}

impl FluxApi {
    /// 設定から FluxApi を作成
    ///
    /// 組み込みのStorageプラグインと、設定ファイルのパーミッションルールが登録されます。
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, ModelRegistry::with_builtin_storages(), Vec::new())
    }

    /// レジストリと追加のパーミッションプラグインを指定して作成
    ///
    /// # Arguments
    ///
    /// * `config` - プロジェクト設定
    /// * `registry` - モデルとStorageプラグインを登録済みのレジストリ
    /// * `plugins` - 設定ファイルのルールに加えて使用するパーミッションプラグイン
    pub fn with_registry(
        config: Config,
        registry: ModelRegistry,
        plugins: Vec<Arc<dyn PermissionPlugin>>,
    ) -> Self {
        let registry = Arc::new(registry);

        let mut permissions = PermissionService::new(config.permissions.default_access);
        if !config.permissions.rules.is_empty() {
            permissions.add_plugin(Arc::new(RulePermission::new(
                config.permissions.rules.clone(),
            )));
        }
        for plugin in plugins {
            permissions.add_plugin(plugin);
        }
        let permissions = Arc::new(permissions);

        let dispatcher = Arc::new(EventDispatcher::new());
        let storages = Arc::new(StorageFactory::new(
            registry.clone(),
            config.storage.clone(),
            config.model_storages.clone(),
        ));
        let models = ModelFactory::new(
            registry.clone(),
            permissions.clone(),
            dispatcher.clone(),
            storages.clone(),
        );

        Self {
            config,
            registry,
            permissions,
            dispatcher,
            storages,
            models,
        }
    }

    /// Modelプラグインを登録
    pub fn register_model(&self, definition: ModelDefinition) -> Result<(), PluginError> {
        self.registry.register_model(definition)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// モデルのCRUD操作
    pub fn models(&self) -> &ModelFactory {
        &self.models
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn permissions(&self) -> &PermissionService {
        &self.permissions
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn storages(&self) -> &StorageFactory {
        &self.storages
    }

    /// 全ストレージのスキーマをモデル定義に合わせる
    ///
    /// ストレージごとに、そのストレージに保存されるモデルのみを反映します。
    pub async fn migrate(&self, options: MigrationOptions) -> Result<Vec<MigrationReport>, FluxError> {
        let migrator = SchemaMigrator::new();
        let mut reports = Vec::new();

        for (plugin, model_names) in self.storages.models_by_storage() {
            let storage = self.storages.storage(&plugin)?;
            let models = model_names
                .iter()
                .map(|name| self.registry.get_model(name))
                .collect::<Result<Vec<_>, _>>()?;

            let report = migrator
                .migrate(storage.as_ref(), &models, self.registry.as_ref(), options)
                .await?;
            info!(
                storage = %plugin,
                executed = report.executed.len(),
                skipped = report.skipped_destructive.len(),
                dry_run = report.dry_run,
                "Migration finished"
            );
            reports.push(report);
        }

        Ok(reports)
    }
}
