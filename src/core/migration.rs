// マイグレーションドメインモデル
//
// スキーマ差分から生成したSQLの実行計画と、その実行結果を表現します。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::Dialect;

/// マイグレーションのオプション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// SQLを実行せずに計画のみを返す
    pub dry_run: bool,

    /// テーブル・カラム・インデックスの削除を許可
    pub allow_destructive: bool,
}

/// マイグレーション計画
///
/// 実行順に並んだSQL文と、実行されない文・警告を保持します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// 対象データベース方言
    pub dialect: Dialect,

    /// 実行するSQL文（実行順）
    pub statements: Vec<String>,

    /// 破壊的変更のため保留されたSQL文
    pub skipped_destructive: Vec<String>,

    /// 方言が対応していないなどの理由で適用できない変更
    pub warnings: Vec<String>,
}

impl MigrationPlan {
    /// 空の計画を作成
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            statements: Vec::new(),
            skipped_destructive: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// 実行するSQL文がないかどうか
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// マイグレーション実行結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// ストレージ名
    pub storage: String,

    /// 実行した（dry runの場合は実行予定の）SQL文
    pub executed: Vec<String>,

    /// 保留された破壊的SQL文
    pub skipped_destructive: Vec<String>,

    /// 警告
    pub warnings: Vec<String>,

    /// dry runかどうか
    pub dry_run: bool,

    /// 開始時刻
    pub started_at: DateTime<Utc>,

    /// 終了時刻
    pub finished_at: DateTime<Utc>,
}

impl MigrationReport {
    /// 計画から実行結果を作成
    pub fn from_plan(
        storage: impl Into<String>,
        plan: MigrationPlan,
        dry_run: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            storage: storage.into(),
            executed: plan.statements,
            skipped_destructive: plan.skipped_destructive,
            warnings: plan.warnings,
            dry_run,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// スキーマが既に最新だったかどうか
    pub fn is_up_to_date(&self) -> bool {
        self.executed.is_empty() && self.skipped_destructive.is_empty() && self.warnings.is_empty()
    }

    /// 実行時間（ミリ秒）
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_plan() {
        let mut plan = MigrationPlan::new(Dialect::SQLite);
        plan.statements.push("CREATE TABLE \"node\" (\n    \"id\" INTEGER\n)".to_string());
        plan.skipped_destructive.push("DROP TABLE \"legacy\"".to_string());

        let report = MigrationReport::from_plan("Sqlite", plan, true, Utc::now());

        assert_eq!(report.storage, "Sqlite");
        assert_eq!(report.executed.len(), 1);
        assert_eq!(report.skipped_destructive.len(), 1);
        assert!(report.dry_run);
        assert!(!report.is_up_to_date());
        assert!(report.duration_ms() >= 0);
    }

    #[test]
    fn test_empty_plan_is_up_to_date() {
        let plan = MigrationPlan::new(Dialect::MySQL);
        assert!(plan.is_empty());

        let report = MigrationReport::from_plan("MySql", plan, false, Utc::now());
        assert!(report.is_up_to_date());
    }
}
