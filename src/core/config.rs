// 設定ファイル管理
//
// プロジェクトの設定ファイル（YAML形式）の構造定義と検証を行います。
// ストレージ接続、パーミッションルール、マイグレーション動作を保持します。

use crate::core::permission::ModelAction;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

/// データベース方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "sqlite")]
    SQLite,
}

impl Dialect {
    /// 方言のデフォルトポート
    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::MySQL => 3306,
            Dialect::SQLite => 0,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::MySQL => write!(f, "mysql"),
            Dialect::SQLite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for Dialect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySQL),
            "sqlite" | "sqlite3" => Ok(Dialect::SQLite),
            other => Err(anyhow!(
                "Unsupported database dialect: {}. Please specify one of: mysql, sqlite.",
                other
            )),
        }
    }
}

/// プロジェクト設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 設定ファイルのバージョン
    #[serde(default = "default_version")]
    pub version: String,

    /// モデル定義ディレクトリ
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// ストレージ設定
    pub storage: StorageConfig,

    /// モデルごとのストレージプラグイン指定（モデル名 -> プラグイン名）
    #[serde(default)]
    pub model_storages: HashMap<String, String>,

    /// パーミッション設定
    #[serde(default)]
    pub permissions: PermissionConfig,

    /// マイグレーション設定
    #[serde(default)]
    pub migration: MigrationConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = crate::core::naming::CONFIG_FILE;

    /// ストレージ設定のみを指定して設定を作成
    pub fn with_storage(storage: StorageConfig) -> Self {
        Self {
            version: default_version(),
            models_dir: default_models_dir(),
            storage,
            model_storages: HashMap::new(),
            permissions: PermissionConfig::default(),
            migration: MigrationConfig::default(),
        }
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() {
            return Err(anyhow!("Config file version is not specified"));
        }

        self.storage
            .validate()
            .with_context(|| "Invalid storage configuration")?;

        for (model, plugin) in &self.model_storages {
            if plugin.is_empty() {
                return Err(anyhow!("Storage plugin for model '{}' is empty", model));
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        serde_saphyr::from_str(yaml).with_context(|| "Failed to parse config file")
    }
}

/// ストレージ接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// デフォルトのストレージプラグイン名
    #[serde(default = "default_plugin")]
    pub plugin: String,

    /// データベース方言
    #[serde(default = "default_dialect")]
    pub dialect: Dialect,

    /// ホスト名（SQLiteの場合は不要）
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号（未指定の場合は方言のデフォルト）
    pub port: Option<u16>,

    /// データベース名（SQLiteの場合はファイルパス）
    pub database: String,

    /// ユーザー名
    pub user: Option<String>,

    /// パスワード
    pub password: Option<String>,

    /// テーブル名のプレフィックス
    #[serde(default)]
    pub table_prefix: String,

    /// 実行するSQLをログに出力する
    #[serde(default)]
    pub debug_sql: bool,

    /// 接続タイムアウト（秒）
    pub timeout: Option<u64>,
}

fn default_plugin() -> String {
    "MySql".to_string()
}

fn default_dialect() -> Dialect {
    Dialect::MySQL
}

fn default_host() -> String {
    "localhost".to_string()
}

impl StorageConfig {
    /// SQLiteファイル用の設定を作成
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            plugin: "Sqlite".to_string(),
            dialect: Dialect::SQLite,
            host: String::new(),
            port: None,
            database: path.into(),
            user: None,
            password: None,
            table_prefix: String::new(),
            debug_sql: false,
            timeout: None,
        }
    }

    /// 実際に使用するポート番号
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or_else(|| self.dialect.default_port())
    }

    /// Validate storage configuration
    pub fn validate(&self) -> Result<()> {
        if self.plugin.is_empty() {
            return Err(anyhow!("Storage plugin is not specified"));
        }

        if self.database.is_empty() {
            return Err(anyhow!("Database name is not specified"));
        }

        if self.dialect == Dialect::MySQL && self.host.is_empty() {
            return Err(anyhow!("Host is required for the mysql dialect"));
        }

        Ok(())
    }
}

/// アクセス既定値
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefaultAccess {
    #[default]
    Allow,
    Deny,
}

impl DefaultAccess {
    /// 許可かどうか
    pub fn is_allow(&self) -> bool {
        matches!(self, DefaultAccess::Allow)
    }
}

/// パーミッション設定
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PermissionConfig {
    /// どのプラグインも判断しなかった場合のアクセス可否
    #[serde(default)]
    pub default_access: DefaultAccess,

    /// パーミッションルール（後に書かれたルールが優先）
    #[serde(default)]
    pub rules: Vec<PermissionRule>,
}

/// パーミッションルール
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// 対象モデル名（`*` は全モデル）
    pub model: String,

    /// 対象アクション（空の場合は全アクション）
    #[serde(default)]
    pub actions: Vec<ModelAction>,

    /// 許可するかどうか
    pub allow: bool,
}

impl PermissionRule {
    /// ルールがモデルとアクションに一致するか
    pub fn matches(&self, model: &str, action: ModelAction) -> bool {
        let model_matches = self.model == "*" || self.model == model;
        let action_matches = self.actions.is_empty() || self.actions.contains(&action);
        model_matches && action_matches
    }
}

/// マイグレーション設定
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MigrationConfig {
    /// テーブル・カラム・インデックスの削除を許可
    #[serde(default)]
    pub allow_destructive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::MySQL.to_string(), "mysql");
        assert_eq!(Dialect::SQLite.to_string(), "sqlite");
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("MySQL".parse::<Dialect>().unwrap(), Dialect::MySQL);
        assert_eq!("sqlite3".parse::<Dialect>().unwrap(), Dialect::SQLite);
        assert!("postgresql".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
storage:
  database: fluxapi
"#;
        let config: Config = yaml.parse().unwrap();

        assert_eq!(config.version, "1.0");
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert_eq!(config.storage.plugin, "MySql");
        assert_eq!(config.storage.dialect, Dialect::MySQL);
        assert_eq!(config.storage.port_or_default(), 3306);
        assert!(!config.storage.debug_sql);
        assert!(config.permissions.default_access.is_allow());
        assert!(!config.migration.allow_destructive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
version: "1.0"
models_dir: app/models
storage:
  plugin: MySql
  dialect: mysql
  host: db.internal
  port: 3307
  database: flux
  user: flux
  password: secret
  table_prefix: flux_
  debug_sql: true
model_storages:
  Log: Sqlite
permissions:
  default_access: deny
  rules:
    - model: "*"
      actions: [load]
      allow: true
    - model: Node
      allow: true
migration:
  allow_destructive: true
"#;
        let config: Config = yaml.parse().unwrap();

        assert_eq!(config.storage.port_or_default(), 3307);
        assert_eq!(config.storage.table_prefix, "flux_");
        assert_eq!(config.model_storages.get("Log").unwrap(), "Sqlite");
        assert_eq!(config.permissions.default_access, DefaultAccess::Deny);
        assert_eq!(config.permissions.rules.len(), 2);
        assert_eq!(config.permissions.rules[0].actions, vec![ModelAction::Load]);
        assert!(config.migration.allow_destructive);
    }

    #[test]
    fn test_validate_rejects_empty_database() {
        let mut storage = StorageConfig::sqlite("");
        storage.database.clear();
        let config = Config::with_storage(storage);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_permission_rule_matches() {
        let rule = PermissionRule {
            model: "*".to_string(),
            actions: vec![ModelAction::Delete],
            allow: false,
        };

        assert!(rule.matches("Node", ModelAction::Delete));
        assert!(!rule.matches("Node", ModelAction::Load));
    }
}
