// ライフサイクルイベント
//
// モデルのCRUD操作の前後で発行されるイベントを表現します。

use crate::core::model::Model;
use crate::core::query::Query;

/// イベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelEventKind {
    BeforeCreate,
    Create,
    BeforeLoad,
    Load,
    BeforeSave,
    Save,
    BeforeUpdate,
    Update,
    BeforeDelete,
    Delete,
}

impl ModelEventKind {
    /// イベント名（`model.before_create` 形式）
    pub fn name(&self) -> &'static str {
        match self {
            ModelEventKind::BeforeCreate => "model.before_create",
            ModelEventKind::Create => "model.create",
            ModelEventKind::BeforeLoad => "model.before_load",
            ModelEventKind::Load => "model.load",
            ModelEventKind::BeforeSave => "model.before_save",
            ModelEventKind::Save => "model.save",
            ModelEventKind::BeforeUpdate => "model.before_update",
            ModelEventKind::Update => "model.update",
            ModelEventKind::BeforeDelete => "model.before_delete",
            ModelEventKind::Delete => "model.delete",
        }
    }
}

impl std::fmt::Display for ModelEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// モデルイベント
#[derive(Debug, Clone)]
pub struct ModelEvent<'a> {
    /// イベント種別
    pub kind: ModelEventKind,
    /// 対象モデル名
    pub model_name: &'a str,
    /// 関連するクエリ
    pub query: Option<&'a Query>,
    /// 関連するインスタンス
    pub instance: Option<&'a Model>,
}

impl<'a> ModelEvent<'a> {
    /// 新しいイベントを作成
    pub fn new(kind: ModelEventKind, model_name: &'a str) -> Self {
        Self {
            kind,
            model_name,
            query: None,
            instance: None,
        }
    }

    pub fn with_query(mut self, query: Option<&'a Query>) -> Self {
        self.query = query;
        self
    }

    pub fn with_instance(mut self, instance: &'a Model) -> Self {
        self.instance = Some(instance);
        self
    }
}
