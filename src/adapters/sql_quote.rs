// SQL識別子クォートユーティリティ
//
// 識別子の検証と各データベース方言用のクォート関数を提供します。
// クエリビルダーとSQLジェネレーターの両方から使用される共有モジュールです。

use crate::core::config::Dialect;
use crate::core::error::QueryError;
use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// 単一の識別子（テーブル名・カラム名）を検証
pub fn validate_identifier(name: &str) -> Result<(), QueryError> {
    if IDENTIFIER_REGEX.as_ref().is_some_and(|re| re.is_match(name)) {
        Ok(())
    } else {
        Err(QueryError::InvalidIdentifier {
            identifier: name.to_string(),
        })
    }
}

/// `table.column` 形式を含む識別子を検証
///
/// 最後の要素に限り `*` を許可します。
pub fn validate_qualified_identifier(name: &str) -> Result<(), QueryError> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 {
        return Err(QueryError::InvalidIdentifier {
            identifier: name.to_string(),
        });
    }

    for (i, part) in parts.iter().enumerate() {
        let is_last = i == parts.len() - 1;
        if is_last && *part == "*" {
            continue;
        }
        validate_identifier(part).map_err(|_| QueryError::InvalidIdentifier {
            identifier: name.to_string(),
        })?;
    }

    Ok(())
}

/// MySQL用識別子クォート（バッククォート）
///
/// 識別子内のバッククォートは二重にエスケープします。
///
/// # Examples
/// ```
/// use fluxapi::adapters::sql_quote::quote_identifier_mysql;
/// assert_eq!(quote_identifier_mysql("users"), "`users`");
/// assert_eq!(quote_identifier_mysql("table`name"), "`table``name`");
/// ```
pub fn quote_identifier_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// SQLite用識別子クォート（ダブルクォート）
///
/// 識別子内のダブルクォートは二重にエスケープします。
///
/// # Examples
/// ```
/// use fluxapi::adapters::sql_quote::quote_identifier_sqlite;
/// assert_eq!(quote_identifier_sqlite("users"), r#""users""#);
/// ```
pub fn quote_identifier_sqlite(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 方言に応じて識別子をクォート
pub fn quote_identifier(dialect: Dialect, name: &str) -> String {
    match dialect {
        Dialect::MySQL => quote_identifier_mysql(name),
        Dialect::SQLite => quote_identifier_sqlite(name),
    }
}

/// `table.column` 形式の識別子を要素ごとにクォート（`*` はそのまま）
pub fn quote_qualified(dialect: Dialect, name: &str) -> String {
    name.split('.')
        .map(|part| {
            if part == "*" {
                part.to_string()
            } else {
                quote_identifier(dialect, part)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// カラム名リストをクォートしてカンマ区切りで結合
pub fn quote_columns(dialect: Dialect, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(dialect, c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SQL文字列リテラルをエスケープ
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
