/// MySQLストレージの統合テスト
///
/// testcontainersでMySQLコンテナを起動し、マイグレーションとCRUD操作を確認します。
///
/// 注意: Docker必須のテストは #[ignore] アトリビュートでマークされています。
/// Docker起動時に実行するには: `cargo test -- --ignored`

#[cfg(test)]
mod mysql_integration_tests {
    use fluxapi::adapters::storage::Storage;
    use fluxapi::core::config::{Config, Dialect, StorageConfig};
    use fluxapi::core::field::{Field, FieldType, RelationType};
    use fluxapi::core::migration::MigrationOptions;
    use fluxapi::core::model::ModelDefinition;
    use fluxapi::core::query::Query;
    use fluxapi::services::api::FluxApi;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
    use testcontainers_modules::mysql::Mysql as MysqlImage;

    /// MySQLコンテナを起動してストレージ設定を作成
    async fn setup_mysql_container(
    ) -> Result<(ContainerAsync<MysqlImage>, StorageConfig), Box<dyn std::error::Error>> {
        let container = MysqlImage::default().with_tag("8.0").start().await?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(3306).await?;

        let config = StorageConfig {
            plugin: "MySql".to_string(),
            dialect: Dialect::MySQL,
            host: host.to_string(),
            port: Some(port),
            database: "test".to_string(),
            user: Some("root".to_string()),
            password: None,
            table_prefix: "flux_".to_string(),
            debug_sql: true,
            timeout: Some(30),
        };
        Ok((container, config))
    }

    fn tag_model() -> ModelDefinition {
        ModelDefinition::new("Tag").with_field(Field::new("label", FieldType::String).unique())
    }

    fn node_model(title_length: u32) -> ModelDefinition {
        ModelDefinition::new("Node")
            .with_field(Field::new("title", FieldType::String).with_length(title_length))
            .with_field(Field::new("price", FieldType::Decimal).with_precision(8, 2))
            .with_field(Field::new("published", FieldType::Boolean).with_default(false))
            .with_field(Field::relation("tags", "Tag", RelationType::BelongsToMany))
    }

    fn build_api(storage: &StorageConfig, node: ModelDefinition) -> FluxApi {
        let api = FluxApi::new(Config::with_storage(storage.clone()));
        api.register_model(tag_model()).unwrap();
        api.register_model(node).unwrap();
        api
    }

    fn data(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    /// マイグレーション後にスキーマが一致し、変更が検出されないことを確認
    #[tokio::test]
    #[ignore] // Docker必須
    async fn test_mysql_migration_round_trip() {
        let (_container, storage) = setup_mysql_container().await.unwrap();
        let api = build_api(&storage, node_model(120));

        let reports = api.migrate(MigrationOptions::default()).await.unwrap();
        assert_eq!(reports[0].storage, "MySql");
        assert!(!reports[0].executed.is_empty());

        let schema = api
            .storages()
            .storage_for("Node")
            .unwrap()
            .introspect()
            .await
            .unwrap();
        assert!(schema.has_table("flux_node"));
        assert!(schema.has_table("flux_node_rel"));
        assert!(schema.has_table("flux_tag"));

        let reports = api.migrate(MigrationOptions::default()).await.unwrap();
        assert!(reports[0].is_up_to_date(), "unexpected changes: {:?}", reports[0]);
    }

    /// カラム長の変更が MODIFY COLUMN で適用されることを確認
    #[tokio::test]
    #[ignore] // Docker必須
    async fn test_mysql_modify_column() {
        let (_container, storage) = setup_mysql_container().await.unwrap();
        build_api(&storage, node_model(120))
            .migrate(MigrationOptions::default())
            .await
            .unwrap();

        let api = build_api(&storage, node_model(200));
        let reports = api.migrate(MigrationOptions::default()).await.unwrap();
        assert_eq!(
            reports[0].executed,
            vec!["ALTER TABLE `flux_node` MODIFY COLUMN `title` VARCHAR(200)".to_string()]
        );

        let reports = api.migrate(MigrationOptions::default()).await.unwrap();
        assert!(reports[0].is_up_to_date());
    }

    /// CRUDとリレーション操作を確認
    #[tokio::test]
    #[ignore] // Docker必須
    async fn test_mysql_crud_and_relations() {
        let (_container, storage) = setup_mysql_container().await.unwrap();
        let api = build_api(&storage, node_model(120));
        api.migrate(MigrationOptions::default()).await.unwrap();

        let mut nodes = vec![
            api.models()
                .create("Node", data(json!({ "title": "a", "price": 9.5 })), true)
                .unwrap(),
            api.models()
                .create("Node", data(json!({ "title": "b", "price": 20 })), true)
                .unwrap(),
        ];
        api.models().save("Node", &mut nodes).await.unwrap();
        assert!(nodes.iter().all(|node| !node.is_new()));

        let mut tags = vec![api
            .models()
            .create("Tag", data(json!({ "label": "db" })), true)
            .unwrap()];
        api.models().save("Tag", &mut tags).await.unwrap();

        api.models()
            .add_relation(&nodes[0], "tags", &tags[0])
            .await
            .unwrap();
        let related = api.models().load_relation(&nodes[0], "tags").await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].get("label"), Some(&json!("db")));

        let cheap = api
            .models()
            .load("Node", Some(Query::new().lt("price", 10)))
            .await
            .unwrap();
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap[0].get("price"), Some(&json!(9.5)));
        assert_eq!(cheap[0].get("published"), Some(&json!(false)));

        let updated = api
            .models()
            .update(
                "Node",
                Some(Query::new().equal("title", "b")),
                data(json!({ "published": true })),
            )
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let deleted = api
            .models()
            .delete("Node", Some(Query::new().equal("published", true)))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(
            api.storages()
                .storage_for("Node")
                .unwrap()
                .count("Node", None)
                .await
                .unwrap(),
            1
        );
    }
}
