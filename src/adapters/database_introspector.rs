// データベースイントロスペクター
//
// データベースからスキーマ情報を取得するための抽象化レイヤー。
// 各方言固有のINFORMATION_SCHEMA/PRAGMAクエリを実装します。

use crate::adapters::type_mapping::create_type_mapper;
use crate::core::config::Dialect;
use crate::core::error::DatabaseError;
use crate::core::schema::{Column, ColumnType, Index, Schema, Table};
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::{AnyPool, Row};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 生のカラム情報（DB固有フォーマット）
///
/// データベースから取得したカラム情報を保持する構造体。
/// 型マッパーで ColumnType に変換されます。
#[derive(Debug, Clone)]
pub struct RawColumnInfo {
    /// カラム名
    pub name: String,
    /// データ型（DB固有の型文字列）
    pub data_type: String,
    /// NULL許可フラグ
    pub is_nullable: bool,
    /// デフォルト値
    pub default_value: Option<String>,
    /// 自動増分フラグ
    pub auto_increment: bool,
}

/// 生のインデックス情報（DB固有フォーマット）
#[derive(Debug, Clone)]
pub struct RawIndexInfo {
    /// インデックス名
    pub name: String,
    /// インデックス対象のカラム
    pub columns: Vec<String>,
    /// ユニーク制約フラグ
    pub unique: bool,
}

/// データベーススキーマ取得インターフェース
///
/// 各データベース方言固有のイントロスペクション処理を抽象化します。
#[async_trait]
pub trait DatabaseIntrospector: Send + Sync {
    /// 方言を取得
    fn dialect(&self) -> Dialect;

    /// テーブル名一覧を取得
    async fn get_table_names(&self, pool: &AnyPool) -> Result<Vec<String>, DatabaseError>;

    /// カラム情報を取得
    async fn get_columns(
        &self,
        pool: &AnyPool,
        table_name: &str,
    ) -> Result<Vec<RawColumnInfo>, DatabaseError>;

    /// プライマリキーのカラムを取得
    async fn get_primary_key(
        &self,
        pool: &AnyPool,
        table_name: &str,
    ) -> Result<Vec<String>, DatabaseError>;

    /// インデックス情報を取得（プライマリキーを除く）
    async fn get_indexes(
        &self,
        pool: &AnyPool,
        table_name: &str,
    ) -> Result<Vec<RawIndexInfo>, DatabaseError>;
}

/// MySQL用イントロスペクター
pub struct MySqlIntrospector;

/// SQLite用イントロスペクター
pub struct SqliteIntrospector;

/// 方言に応じたイントロスペクターを作成
pub fn create_introspector(dialect: Dialect) -> Box<dyn DatabaseIntrospector> {
    match dialect {
        Dialect::MySQL => Box::new(MySqlIntrospector),
        Dialect::SQLite => Box::new(SqliteIntrospector),
    }
}

/// データベースの現在のスキーマを取得
///
/// # Arguments
///
/// * `introspector` - 方言ごとのイントロスペクター
/// * `pool` - データベース接続プール
///
/// # Returns
///
/// 取得したスキーマ
pub async fn introspect_schema(
    introspector: &dyn DatabaseIntrospector,
    pool: &AnyPool,
) -> Result<Schema, DatabaseError> {
    let mapper = create_type_mapper(introspector.dialect());
    let mut schema = Schema::new();

    for table_name in introspector.get_table_names(pool).await? {
        let mut table = Table::new(&table_name);

        for raw in introspector.get_columns(pool, &table_name).await? {
            let column_type = mapper.parse_sql_type(&raw.data_type).unwrap_or_else(|| {
                warn!(table = %table_name, column = %raw.name, data_type = %raw.data_type, "Unknown column type, treating as text");
                ColumnType::Text
            });
            let mut column = Column::new(raw.name, column_type, raw.is_nullable);
            column.auto_increment = raw.auto_increment;
            column.default_value = raw.default_value;
            table.add_column(column);
        }

        table.set_primary_key(introspector.get_primary_key(pool, &table_name).await?);

        for raw in introspector.get_indexes(pool, &table_name).await? {
            table.add_index(Index::new(raw.name, raw.columns, raw.unique));
        }

        debug!(table = %table_name, columns = table.columns.len(), "Introspected table");
        schema.add_table(table);
    }

    Ok(schema)
}

fn introspection_error(e: sqlx::Error) -> DatabaseError {
    DatabaseError::Introspection {
        message: e.to_string(),
    }
}

/// 文字列カラムを取得
///
/// MySQLのINFORMATION_SCHEMAはバイナリ文字列を返すことがあるため、バイト列にもフォールバックします。
fn get_string(row: &AnyRow, index: usize) -> Result<Option<String>, DatabaseError> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value);
    }
    row.try_get::<Option<Vec<u8>>, _>(index)
        .map(|value| value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
        .map_err(introspection_error)
}

fn get_required_string(row: &AnyRow, index: usize) -> Result<String, DatabaseError> {
    get_string(row, index)?.ok_or_else(|| DatabaseError::Introspection {
        message: format!("Unexpected NULL in column {}", index),
    })
}

/// インデックス行（インデックス名, カラム名, ユニーク）をインデックスごとにまとめる
fn group_indexes(rows: Vec<(String, String, bool)>) -> Vec<RawIndexInfo> {
    let mut index_map: BTreeMap<String, (Vec<String>, bool)> = BTreeMap::new();

    for (index_name, column_name, unique) in rows {
        let entry = index_map
            .entry(index_name)
            .or_insert_with(|| (Vec::new(), unique));
        entry.0.push(column_name);
    }

    index_map
        .into_iter()
        .map(|(name, (columns, unique))| RawIndexInfo {
            name,
            columns,
            unique,
        })
        .collect()
}

// =============================================================================
// MySQL イントロスペクター実装
// =============================================================================

#[async_trait]
impl DatabaseIntrospector for MySqlIntrospector {
    fn dialect(&self) -> Dialect {
        Dialect::MySQL
    }

    async fn get_table_names(&self, pool: &AnyPool) -> Result<Vec<String>, DatabaseError> {
        let sql = r#"
            SELECT CAST(table_name AS CHAR)
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(sql)
            .fetch_all(pool)
            .await
            .map_err(introspection_error)?;

        rows.iter().map(|row| get_required_string(row, 0)).collect()
    }

    async fn get_columns(
        &self,
        pool: &AnyPool,
        table_name: &str,
    ) -> Result<Vec<RawColumnInfo>, DatabaseError> {
        let sql = r#"
            SELECT
                CAST(column_name AS CHAR),
                CAST(column_type AS CHAR),
                CAST(is_nullable AS CHAR),
                CAST(column_default AS CHAR),
                CAST(extra AS CHAR)
            FROM information_schema.columns
            WHERE table_name = ? AND table_schema = DATABASE()
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(pool)
            .await
            .map_err(introspection_error)?;

        rows.iter()
            .map(|row| {
                let extra = get_string(row, 4)?.unwrap_or_default();
                Ok(RawColumnInfo {
                    name: get_required_string(row, 0)?,
                    data_type: get_required_string(row, 1)?,
                    is_nullable: get_required_string(row, 2)? == "YES",
                    default_value: get_string(row, 3)?,
                    auto_increment: extra.to_lowercase().contains("auto_increment"),
                })
            })
            .collect()
    }

    async fn get_primary_key(
        &self,
        pool: &AnyPool,
        table_name: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let sql = r#"
            SELECT CAST(column_name AS CHAR)
            FROM information_schema.statistics
            WHERE table_name = ? AND table_schema = DATABASE()
                AND index_name = 'PRIMARY'
            ORDER BY seq_in_index
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(pool)
            .await
            .map_err(introspection_error)?;

        rows.iter().map(|row| get_required_string(row, 0)).collect()
    }

    async fn get_indexes(
        &self,
        pool: &AnyPool,
        table_name: &str,
    ) -> Result<Vec<RawIndexInfo>, DatabaseError> {
        let sql = r#"
            SELECT
                CAST(index_name AS CHAR),
                CAST(column_name AS CHAR),
                CAST(non_unique AS SIGNED)
            FROM information_schema.statistics
            WHERE table_name = ? AND table_schema = DATABASE()
                AND index_name != 'PRIMARY'
            ORDER BY index_name, seq_in_index
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(pool)
            .await
            .map_err(introspection_error)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let non_unique: i64 = row.try_get(2).map_err(introspection_error)?;
            entries.push((
                get_required_string(row, 0)?,
                get_required_string(row, 1)?,
                non_unique == 0,
            ));
        }

        Ok(group_indexes(entries))
    }
}

// =============================================================================
// SQLite イントロスペクター実装
// =============================================================================

#[async_trait]
impl DatabaseIntrospector for SqliteIntrospector {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    async fn get_table_names(&self, pool: &AnyPool) -> Result<Vec<String>, DatabaseError> {
        let sql = r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;

        let rows = sqlx::query(sql)
            .fetch_all(pool)
            .await
            .map_err(introspection_error)?;

        rows.iter().map(|row| get_required_string(row, 0)).collect()
    }

    async fn get_columns(
        &self,
        pool: &AnyPool,
        table_name: &str,
    ) -> Result<Vec<RawColumnInfo>, DatabaseError> {
        let sql = r#"
            SELECT name, type, "notnull", dflt_value, pk
            FROM pragma_table_info(?)
            ORDER BY cid
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(pool)
            .await
            .map_err(introspection_error)?;

        let pk_count = rows
            .iter()
            .filter(|row| row.try_get::<i64, _>(4).unwrap_or(0) > 0)
            .count();

        rows.iter()
            .map(|row| {
                let not_null: i64 = row.try_get(2).map_err(introspection_error)?;
                let pk: i64 = row.try_get(4).map_err(introspection_error)?;
                let data_type = get_string(row, 1)?.unwrap_or_default();
                // 単一の INTEGER PRIMARY KEY は ROWID の別名で自動採番される
                let auto_increment =
                    pk > 0 && pk_count == 1 && data_type.eq_ignore_ascii_case("integer");

                Ok(RawColumnInfo {
                    name: get_required_string(row, 0)?,
                    data_type,
                    is_nullable: not_null == 0 && pk == 0,
                    default_value: get_string(row, 3)?,
                    auto_increment,
                })
            })
            .collect()
    }

    async fn get_primary_key(
        &self,
        pool: &AnyPool,
        table_name: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let sql = r#"
            SELECT name
            FROM pragma_table_info(?)
            WHERE pk > 0
            ORDER BY pk
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(pool)
            .await
            .map_err(introspection_error)?;

        rows.iter().map(|row| get_required_string(row, 0)).collect()
    }

    async fn get_indexes(
        &self,
        pool: &AnyPool,
        table_name: &str,
    ) -> Result<Vec<RawIndexInfo>, DatabaseError> {
        let list_sql = r#"
            SELECT name, "unique", origin
            FROM pragma_index_list(?)
        "#;

        let index_rows = sqlx::query(list_sql)
            .bind(table_name)
            .fetch_all(pool)
            .await
            .map_err(introspection_error)?;

        let mut entries = Vec::new();
        for row in &index_rows {
            let index_name = get_required_string(row, 0)?;
            let unique: i64 = row.try_get(1).map_err(introspection_error)?;
            let origin = get_string(row, 2)?.unwrap_or_default();

            // 自動生成インデックス（PRIMARY KEY / UNIQUE制約）は対象外
            if origin == "pk" || index_name.starts_with("sqlite_autoindex") {
                continue;
            }

            let column_rows = sqlx::query("SELECT name FROM pragma_index_info(?) ORDER BY seqno")
                .bind(&index_name)
                .fetch_all(pool)
                .await
                .map_err(introspection_error)?;

            for column_row in &column_rows {
                entries.push((
                    index_name.clone(),
                    get_required_string(column_row, 0)?,
                    unique != 0,
                ));
            }
        }

        Ok(group_indexes(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_indexes() {
        let grouped = group_indexes(vec![
            ("idx_a".to_string(), "x".to_string(), false),
            ("idx_a".to_string(), "y".to_string(), false),
            ("uniq_b".to_string(), "z".to_string(), true),
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].name, "idx_a");
        assert_eq!(grouped[0].columns, vec!["x", "y"]);
        assert!(!grouped[0].unique);
        assert!(grouped[1].unique);
    }

    #[test]
    fn test_create_introspector() {
        assert_eq!(create_introspector(Dialect::MySQL).dialect(), Dialect::MySQL);
        assert_eq!(create_introspector(Dialect::SQLite).dialect(), Dialect::SQLite);
    }
}
