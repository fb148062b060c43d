// 設定ファイル読み込みサービス
//
// core::config の純粋性を保つため、ファイルI/Oと環境変数の参照はこのサービスに集約する。

use crate::core::config::Config;
use crate::core::naming::ENV_PREFIX;
use anyhow::{Context, Result};
use std::path::Path;

/// 設定ファイル読み込みサービス
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// YAMLファイルから設定を読み込む
    ///
    /// 環境変数による上書きを適用し、検証済みの設定を返します。
    pub fn from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: Config = content.parse()?;

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// `FLUXAPI_DB_*` 環境変数でストレージ設定を上書き
    ///
    /// # Arguments
    ///
    /// * `config` - 上書き対象の設定
    /// * `lookup` - 環境変数の取得関数
    pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}_DB_{}", ENV_PREFIX, name));

        if let Some(host) = var("HOST") {
            config.storage.host = host;
        }
        if let Some(port) = var("PORT") {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid {}_DB_PORT: {}", ENV_PREFIX, port))?;
            config.storage.port = Some(port);
        }
        if let Some(user) = var("USER") {
            config.storage.user = Some(user);
        }
        if let Some(password) = var("PASSWORD") {
            config.storage.password = Some(password);
        }
        if let Some(database) = var("DATABASE") {
            config.storage.database = database;
        }

        Ok(())
    }
}
