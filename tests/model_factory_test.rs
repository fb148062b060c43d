/// モデルファクトリーの統合テスト
///
/// パーミッションプラグインとイベントリスナーが、SQLiteストレージに対する
/// 実際のCRUD操作と組み合わさって動作することを確認します。
use fluxapi::adapters::storage::Storage;
use fluxapi::core::config::{Config, DefaultAccess, PermissionRule, StorageConfig};
use fluxapi::core::event::ModelEventKind;
use fluxapi::core::field::{Field, FieldType};
use fluxapi::core::migration::MigrationOptions;
use fluxapi::core::model::{Model, ModelDefinition};
use fluxapi::core::permission::{ModelAction, PermissionPlugin};
use fluxapi::core::query::Query;
use fluxapi::services::api::FluxApi;
use fluxapi::services::model_registry::ModelRegistry;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// タイトルが `locked` のインスタンスの保存を拒否するプラグイン
struct LockedTitle;

impl PermissionPlugin for LockedTitle {
    fn name(&self) -> &str {
        "LockedTitle"
    }

    fn has_model_access(
        &self,
        _model_name: &str,
        instance: Option<&Model>,
        action: ModelAction,
    ) -> Option<bool> {
        let locked = instance
            .and_then(|i| i.get("title"))
            .is_some_and(|title| title == "locked");
        (action == ModelAction::Save && locked).then_some(false)
    }
}

fn note_model() -> ModelDefinition {
    ModelDefinition::new("Note").with_field(Field::new("title", FieldType::String))
}

fn secret_model() -> ModelDefinition {
    ModelDefinition::new("Secret").with_field(Field::new("value", FieldType::String))
}

fn data(value: Value) -> BTreeMap<String, Value> {
    serde_json::from_value(value).unwrap()
}

fn config(dir: &TempDir) -> Config {
    let path = dir.path().join("flux.db").to_string_lossy().into_owned();
    Config::with_storage(StorageConfig::sqlite(path))
}

async fn build_api(config: Config) -> FluxApi {
    let plugins: Vec<Arc<dyn PermissionPlugin>> = vec![Arc::new(LockedTitle)];
    let api = FluxApi::with_registry(config, ModelRegistry::with_builtin_storages(), plugins);
    api.register_model(note_model()).unwrap();
    api.register_model(secret_model()).unwrap();
    api.migrate(MigrationOptions::default()).await.unwrap();
    api
}

fn record_all(api: &FluxApi) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        ModelEventKind::BeforeCreate,
        ModelEventKind::Create,
        ModelEventKind::BeforeLoad,
        ModelEventKind::Load,
        ModelEventKind::BeforeSave,
        ModelEventKind::Save,
        ModelEventKind::BeforeUpdate,
        ModelEventKind::Update,
        ModelEventKind::BeforeDelete,
        ModelEventKind::Delete,
    ] {
        let log = log.clone();
        api.dispatcher().add_listener(kind, 0, move |event| {
            log.lock()
                .unwrap()
                .push(format!("{}:{}", event.kind, event.model_name));
        });
    }
    log
}

#[cfg(test)]
mod model_factory_tests {
    use super::*;

    /// CRUD操作ごとに前後のイベントが発行されることを確認
    #[tokio::test]
    async fn test_lifecycle_events_in_order() {
        let dir = TempDir::new().unwrap();
        let api = build_api(config(&dir)).await;
        let log = record_all(&api);

        let mut notes = vec![
            api.models()
                .create("Note", data(json!({ "title": "a" })), true)
                .unwrap(),
            api.models()
                .create("Note", data(json!({ "title": "b" })), true)
                .unwrap(),
        ];
        api.models().save("Note", &mut notes).await.unwrap();
        api.models().load("Note", None).await.unwrap();
        api.models()
            .update("Note", None, data(json!({ "title": "c" })))
            .await
            .unwrap();
        api.models().delete("Note", None).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "model.before_create:Note",
                "model.create:Note",
                "model.before_create:Note",
                "model.create:Note",
                "model.before_save:Note",
                "model.before_save:Note",
                "model.save:Note",
                "model.save:Note",
                "model.before_load:Note",
                "model.load:Note",
                "model.load:Note",
                "model.before_update:Note",
                "model.update:Note",
                "model.before_delete:Note",
                "model.delete:Note",
            ]
        );
    }

    /// 保存イベントのリスナーが採番後のインスタンスを受け取ることを確認
    #[tokio::test]
    async fn test_save_event_sees_assigned_id() {
        let dir = TempDir::new().unwrap();
        let api = build_api(config(&dir)).await;

        let ids = Arc::new(Mutex::new(Vec::new()));
        let seen = ids.clone();
        api.dispatcher()
            .add_listener(ModelEventKind::BeforeSave, 0, move |event| {
                seen.lock()
                    .unwrap()
                    .push(event.instance.and_then(|i| i.id().cloned()));
            });
        let seen = ids.clone();
        api.dispatcher().add_listener(ModelEventKind::Save, 0, move |event| {
            seen.lock()
                .unwrap()
                .push(event.instance.and_then(|i| i.id().cloned()));
        });

        let mut notes = vec![api
            .models()
            .create("Note", data(json!({ "title": "x" })), true)
            .unwrap()];
        api.models().save("Note", &mut notes).await.unwrap();

        assert_eq!(*ids.lock().unwrap(), vec![None, Some(json!(1))]);
    }

    /// 設定ファイルのルールで拒否された操作はイベントを発行せずに失敗することを確認
    #[tokio::test]
    async fn test_rule_denies_without_events() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.permissions.default_access = DefaultAccess::Deny;
        config.permissions.rules = vec![
            PermissionRule {
                model: "*".to_string(),
                actions: vec![],
                allow: true,
            },
            PermissionRule {
                model: "Secret".to_string(),
                actions: vec![ModelAction::Load, ModelAction::Delete],
                allow: false,
            },
        ];
        let api = build_api(config).await;
        let log = record_all(&api);

        let mut secrets = vec![api
            .models()
            .create("Secret", data(json!({ "value": "s3cr3t" })), true)
            .unwrap()];
        api.models().save("Secret", &mut secrets).await.unwrap();
        log.lock().unwrap().clear();

        let error = api.models().load("Secret", None).await.unwrap_err();
        assert!(error.is_access_denied());
        assert_eq!(
            error.to_string(),
            "Access denied: You are not allowed to load Secret models."
        );
        assert!(api
            .models()
            .delete("Secret", None)
            .await
            .unwrap_err()
            .is_access_denied());
        assert!(log.lock().unwrap().is_empty());

        assert_eq!(api.models().load("Note", None).await.unwrap().len(), 0);
    }

    /// インスタンス単位のプラグイン判定で保存が拒否されることを確認
    #[tokio::test]
    async fn test_instance_level_denial() {
        let dir = TempDir::new().unwrap();
        let api = build_api(config(&dir)).await;

        let mut open = vec![api
            .models()
            .create("Note", data(json!({ "title": "open" })), true)
            .unwrap()];
        assert!(api.models().save("Note", &mut open).await.unwrap());

        let mut locked = vec![api
            .models()
            .create("Note", data(json!({ "title": "locked" })), true)
            .unwrap()];
        let error = api.models().save("Note", &mut locked).await.unwrap_err();
        assert!(error.is_access_denied());
        assert!(locked[0].is_new());

        let titles: Vec<Value> = api
            .models()
            .load("Note", None)
            .await
            .unwrap()
            .iter()
            .filter_map(|note| note.get("title").cloned())
            .collect();
        assert_eq!(titles, vec![json!("open")]);
    }

    /// 一括保存で1件でも拒否されると何も保存されないことを確認
    #[tokio::test]
    async fn test_denied_batch_save_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let api = build_api(config(&dir)).await;
        let log = record_all(&api);

        let mut notes = vec![
            api.models()
                .create("Note", data(json!({ "title": "open" })), true)
                .unwrap(),
            api.models()
                .create("Note", data(json!({ "title": "locked" })), true)
                .unwrap(),
        ];
        log.lock().unwrap().clear();

        let error = api.models().save("Note", &mut notes).await.unwrap_err();
        assert!(error.is_access_denied());
        assert!(notes.iter().all(|note| note.is_new()));
        assert!(log.lock().unwrap().is_empty());

        let storage = api.storages().storage_for("Note").unwrap();
        assert_eq!(storage.count("Note", None).await.unwrap(), 0);
    }

    /// 読み込みイベントがクエリとインスタンスの両方を持つことを確認
    #[tokio::test]
    async fn test_load_event_carries_query() {
        let dir = TempDir::new().unwrap();
        let api = build_api(config(&dir)).await;

        let mut notes = vec![api
            .models()
            .create("Note", data(json!({ "title": "x" })), true)
            .unwrap()];
        api.models().save("Note", &mut notes).await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        api.dispatcher().add_listener(ModelEventKind::Load, 0, move |event| {
            sink.lock().unwrap().push((
                event.query.map(|q| q.to_string()),
                event.instance.and_then(|i| i.get("title").cloned()),
            ));
        });

        let query = Query::new().equal("title", "x");
        api.models().load("Note", Some(query.clone())).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, Some(query.to_string()));
        assert_eq!(seen[0].1, Some(json!("x")));
    }

    /// 未登録モデルの操作はエラーになることを確認
    #[tokio::test]
    async fn test_unregistered_model() {
        let dir = TempDir::new().unwrap();
        let api = build_api(config(&dir)).await;

        let error = api.models().load("Ghost", None).await.unwrap_err();
        assert!(error.is_not_registered());
        assert!(api
            .models()
            .create("Ghost", BTreeMap::new(), true)
            .unwrap_err()
            .is_not_registered());
    }

    /// 空のリストの保存は何もしないことを確認
    #[tokio::test]
    async fn test_save_empty_list() {
        let dir = TempDir::new().unwrap();
        let api = build_api(config(&dir)).await;

        let mut empty: Vec<Model> = Vec::new();
        assert!(!api.models().save("Note", &mut empty).await.unwrap());
    }

    /// 優先度の高いリスナーから呼ばれることを確認
    #[tokio::test]
    async fn test_listener_priority() {
        let dir = TempDir::new().unwrap();
        let api = build_api(config(&dir)).await;

        let order = Arc::new(Mutex::new(Vec::new()));
        for (name, priority) in [("low", -5), ("high", 10), ("default", 0)] {
            let order = order.clone();
            api.dispatcher()
                .add_listener(ModelEventKind::BeforeLoad, priority, move |_| {
                    order.lock().unwrap().push(name);
                });
        }

        api.models()
            .load_first("Note", Some(Query::new().equal("title", "none")))
            .await
            .unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["high", "default", "low"]);
    }
}
