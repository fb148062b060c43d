// 命名ポリシー
//
// アプリケーション名、設定ファイル名、テーブル命名規則の単一ソースを提供します。

/// 現行アプリケーション名
pub const APP_NAME: &str = "fluxapi";

/// 既定の設定ファイル名
pub const CONFIG_FILE: &str = "fluxapi.yaml";

/// 環境変数のプレフィックス
pub const ENV_PREFIX: &str = "FLUXAPI";

/// IDフィールド名
pub const ID_FIELD: &str = "id";

/// リレーションテーブルのサフィックス
pub const RELATION_TABLE_SUFFIX: &str = "_rel";

/// モデル名からコレクション名を導出
///
/// 名前空間付きの名前（`App::Node`、`App\Node`）は最後の要素のみを使い、
/// 小文字に変換します。
pub fn collection_name(model_name: &str) -> String {
    model_name
        .rsplit(|c| c == '\\' || c == ':')
        .find(|part| !part.is_empty())
        .unwrap_or(model_name)
        .to_lowercase()
}

/// モデル名からテーブル名を導出
pub fn table_name(prefix: &str, model_name: &str) -> String {
    format!("{}{}", prefix, collection_name(model_name))
}

/// モデル名からリレーションテーブル名を導出
pub fn relation_table_name(prefix: &str, model_name: &str) -> String {
    format!("{}{}", table_name(prefix, model_name), RELATION_TABLE_SUFFIX)
}

/// リレーションテーブル内で所有モデルのIDを保持するカラム名
pub fn owner_id_column(model_name: &str) -> String {
    format!("{}_{}", collection_name(model_name), ID_FIELD)
}

/// リレーションテーブル内で関連モデルのIDを保持するカラム名
pub fn relation_id_column(field_name: &str) -> String {
    format!("{}_{}", field_name, ID_FIELD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name() {
        assert_eq!(collection_name("Node"), "node");
        assert_eq!(collection_name("Plugins\\Core\\Model\\Node"), "node");
        assert_eq!(collection_name("core::Node"), "node");
    }

    #[test]
    fn test_table_names() {
        assert_eq!(table_name("flux_", "Node"), "flux_node");
        assert_eq!(relation_table_name("", "Node"), "node_rel");
        assert_eq!(owner_id_column("Node"), "node_id");
        assert_eq!(relation_id_column("parent"), "parent_id");
    }
}
