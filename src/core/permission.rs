// アクセス制御の語彙
//
// モデル操作の種類とパーミッションプラグインのインターフェースを定義します。

use crate::core::model::Model;
use serde::{Deserialize, Serialize};

/// モデルに対する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelAction {
    Create,
    Load,
    Save,
    Update,
    Delete,
}

impl std::fmt::Display for ModelAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelAction::Create => "create",
            ModelAction::Load => "load",
            ModelAction::Save => "save",
            ModelAction::Update => "update",
            ModelAction::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

/// パーミッションプラグイン
///
/// `None` を返した場合は判断を保留し、他のプラグインまたは既定値に委ねます。
pub trait PermissionPlugin: Send + Sync {
    /// プラグイン名
    fn name(&self) -> &str;

    /// モデル操作へのアクセス可否
    fn has_model_access(
        &self,
        model_name: &str,
        instance: Option<&Model>,
        action: ModelAction,
    ) -> Option<bool>;
}
