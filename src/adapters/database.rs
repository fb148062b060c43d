// データベース接続アダプター
//
// SQLxを使用したデータベース接続の管理を行います。
// MySQL、SQLiteに対応した統一されたインターフェースを提供します。

use crate::adapters::connection_string::build_connection_string;
use crate::core::config::{Dialect, StorageConfig};
use crate::core::error::DatabaseError;
use sqlx::pool::PoolOptions;
use sqlx::{Any, AnyPool};
use std::time::Duration;
use tracing::debug;

/// 接続プールの既定の最大接続数
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// 既定の接続タイムアウト（秒）
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// データベース接続サービス
///
/// データベース接続プールの初期化と管理を行います。
#[derive(Debug, Clone, Default)]
pub struct DatabaseConnectionService {}

impl DatabaseConnectionService {
    /// 新しいDatabaseConnectionServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// データベース接続プールを作成
    ///
    /// # Arguments
    ///
    /// * `config` - ストレージ設定
    ///
    /// # Returns
    ///
    /// 接続プールまたはエラー
    pub async fn create_pool(&self, config: &StorageConfig) -> Result<AnyPool, DatabaseError> {
        sqlx::any::install_default_drivers();

        let connection_string = build_connection_string(config);
        let pool_options = self.create_pool_options(config);

        debug!(dialect = %config.dialect, database = %config.database, "Connecting to database");

        pool_options
            .connect(&connection_string)
            .await
            .map_err(|e| DatabaseError::Connection {
                message: format!("Failed to create connection pool for {}", config.dialect),
                cause: e.to_string(),
            })
    }

    /// 接続テストを実行
    pub async fn test_connection(&self, pool: &AnyPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(|e| DatabaseError::Connection {
                message: "Connection test failed".to_string(),
                cause: e.to_string(),
            })
    }

    /// プールオプションを作成
    ///
    /// インメモリSQLiteは接続ごとに別のデータベースになるため、接続数を1に制限します。
    pub fn create_pool_options(&self, config: &StorageConfig) -> PoolOptions<Any> {
        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let max_connections = if config.dialect == Dialect::SQLite && config.database == ":memory:" {
            1
        } else {
            DEFAULT_MAX_CONNECTIONS
        };

        PoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(timeout))
    }

    /// 接続プールを閉じる
    pub async fn close_pool(&self, pool: AnyPool) {
        pool.close().await;
    }
}
