// コマンド共通コンテキスト
//
// 設定ファイルとモデル定義の読み込み、FluxApi の組み立てをCLI層で集約する。

use crate::core::config::Config;
use crate::services::api::FluxApi;
use crate::services::config_loader::ConfigLoader;
use crate::services::model_loader::ModelLoader;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_path: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// 設定を読み込んでコンテキストを作成
    ///
    /// # Arguments
    ///
    /// * `config_path` - 設定ファイルのパス（未指定の場合はカレントディレクトリの既定ファイル）
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir()?.join(Config::DEFAULT_CONFIG_PATH),
        };
        if !config_path.exists() {
            return Err(anyhow!("Config file not found: {:?}", config_path));
        }

        let config =
            ConfigLoader::from_file(&config_path).with_context(|| "Failed to read config file")?;
        let project_path = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            project_path,
            config_path,
            config,
        })
    }

    /// モデル定義ディレクトリの絶対パス
    ///
    /// 相対パスは設定ファイルのディレクトリを基準に解決します。
    pub fn models_dir(&self) -> PathBuf {
        self.project_path.join(&self.config.models_dir)
    }

    /// モデル定義を登録した FluxApi を作成
    pub fn build_api(&self) -> Result<FluxApi> {
        let models_dir = self.models_dir();
        if !models_dir.exists() {
            return Err(anyhow!("Models directory not found: {:?}", models_dir));
        }

        let api = FluxApi::new(self.config.clone());
        for definition in ModelLoader::load_dir(&models_dir)? {
            let name = definition.name.clone();
            api.register_model(definition)
                .with_context(|| format!("Failed to register model '{}'", name))?;
        }
        debug!(models = api.registry().models().len(), "Registered models from {:?}", models_dir);

        Ok(api)
    }
}
