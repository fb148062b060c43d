// モデル定義読み込みサービス
//
// モデル定義ディレクトリ内のYAMLファイルから ModelDefinition を読み込みます。
// 1ファイルに1モデル、またはモデルのリストを記述できます。

use crate::core::model::ModelDefinition;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize)]
#[serde(untagged)]
enum ModelFile {
    Many { models: Vec<ModelDefinition> },
    List(Vec<ModelDefinition>),
    One(ModelDefinition),
}

impl ModelFile {
    fn into_definitions(self) -> Vec<ModelDefinition> {
        match self {
            ModelFile::Many { models } | ModelFile::List(models) => models,
            ModelFile::One(model) => vec![model],
        }
    }
}

/// モデル定義読み込みサービス
#[derive(Debug, Clone, Default)]
pub struct ModelLoader;

impl ModelLoader {
    /// ディレクトリ内の全YAMLファイルを読み込む（ファイル名順）
    pub fn load_dir(dir: &Path) -> Result<Vec<ModelDefinition>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read models directory: {:?}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e == "yaml" || e == "yml")
            })
            .collect();
        paths.sort();

        let mut definitions = Vec::new();
        for path in paths {
            definitions.extend(Self::load_file(&path)?);
        }
        Ok(definitions)
    }

    /// YAMLファイルからモデル定義を読み込む
    pub fn load_file(path: &Path) -> Result<Vec<ModelDefinition>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {:?}", path))?;
        let definitions = Self::parse(&content)
            .with_context(|| format!("Failed to parse model file: {:?}", path))?;
        debug!(file = %path.display(), models = definitions.len(), "Loaded model definitions");
        Ok(definitions)
    }

    /// YAML文字列からモデル定義を読み込む
    pub fn parse(yaml: &str) -> Result<Vec<ModelDefinition>> {
        let file: ModelFile = serde_saphyr::from_str(yaml)?;
        Ok(file.into_definitions())
    }
}
