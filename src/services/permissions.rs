// パーミッションサービス
//
// 登録されたパーミッションプラグインの判断を集約します。
// 明示的な拒否が1つでもあれば拒否、なければ明示的な許可、どちらもなければ既定値に従います。

use crate::core::config::{DefaultAccess, PermissionRule};
use crate::core::model::Model;
use crate::core::permission::{ModelAction, PermissionPlugin};
use std::sync::Arc;
use tracing::debug;

/// パーミッションサービス
pub struct PermissionService {
    plugins: Vec<Arc<dyn PermissionPlugin>>,
    default_access: DefaultAccess,
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("PermissionService")
            .field("plugins", &names)
            .field("default_access", &self.default_access)
            .finish()
    }
}

impl Default for PermissionService {
    fn default() -> Self {
        Self::new(DefaultAccess::Allow)
    }
}

impl PermissionService {
    /// 新しいPermissionServiceを作成
    pub fn new(default_access: DefaultAccess) -> Self {
        Self {
            plugins: Vec::new(),
            default_access,
        }
    }

    /// パーミッションプラグインを追加
    pub fn add_plugin(&mut self, plugin: Arc<dyn PermissionPlugin>) {
        self.plugins.push(plugin);
    }

    /// 既定のアクセス可否
    pub fn default_access(&self) -> DefaultAccess {
        self.default_access
    }

    /// モデル操作へのアクセス可否
    ///
    /// # Arguments
    ///
    /// * `model_name` - 対象モデル名
    /// * `instance` - 対象インスタンス（インスタンス単位の判断が必要な場合）
    /// * `action` - 操作
    pub fn has_model_access(
        &self,
        model_name: &str,
        instance: Option<&Model>,
        action: ModelAction,
    ) -> bool {
        let mut granted = false;

        for plugin in &self.plugins {
            match plugin.has_model_access(model_name, instance, action) {
                Some(false) => {
                    debug!(plugin = %plugin.name(), model = %model_name, action = %action, "Access denied");
                    return false;
                }
                Some(true) => granted = true,
                None => {}
            }
        }

        granted || self.default_access.is_allow()
    }
}

/// 設定ファイルのルールで判断するパーミッションプラグイン
///
/// 一致したルールのうち最後のものが採用されます。
#[derive(Debug, Clone, Default)]
pub struct RulePermission {
    rules: Vec<PermissionRule>,
}

impl RulePermission {
    pub fn new(rules: Vec<PermissionRule>) -> Self {
        Self { rules }
    }
}

impl PermissionPlugin for RulePermission {
    fn name(&self) -> &str {
        "Rules"
    }

    fn has_model_access(
        &self,
        model_name: &str,
        _instance: Option<&Model>,
        action: ModelAction,
    ) -> Option<bool> {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(model_name, action))
            .map(|rule| rule.allow)
    }
}
