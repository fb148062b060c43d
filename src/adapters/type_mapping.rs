// 型マッピング
//
// データベースから取得した型文字列を ColumnType に変換します。
// MySQLは COLUMN_TYPE（例: `int(10) unsigned`）、SQLiteは宣言型（例: `VARCHAR(255)`）を入力とします。

use crate::core::config::Dialect;
use crate::core::schema::ColumnType;

/// 型マッパートレイト
pub trait TypeMapper {
    /// SQL型文字列を ColumnType に変換
    ///
    /// 解釈できない型の場合は None を返します。
    fn parse_sql_type(&self, sql_type: &str) -> Option<ColumnType>;
}

/// MySQL用型マッパー
pub struct MySqlTypeMapper;

/// SQLite用型マッパー
pub struct SqliteTypeMapper;

/// 方言に応じた型マッパーを作成
pub fn create_type_mapper(dialect: Dialect) -> Box<dyn TypeMapper + Send + Sync> {
    match dialect {
        Dialect::MySQL => Box::new(MySqlTypeMapper),
        Dialect::SQLite => Box::new(SqliteTypeMapper),
    }
}

/// 型文字列を（基本型, 括弧内の引数, unsigned）に分解
///
/// `decimal(10,2) unsigned` -> ("decimal", [10, 2], true)
fn split_type(sql_type: &str) -> (String, Vec<u32>, bool) {
    let lower = sql_type.trim().to_lowercase();
    let unsigned = lower.split_whitespace().any(|part| part == "unsigned");

    let (base, args) = match lower.find('(') {
        Some(start) => {
            let end = lower[start..].find(')').map(|e| start + e).unwrap_or(lower.len());
            let args = lower[start + 1..end]
                .split(',')
                .filter_map(|arg| arg.trim().parse::<u32>().ok())
                .collect();
            (lower[..start].trim().to_string(), args)
        }
        None => {
            let base = lower.split_whitespace().next().unwrap_or("").to_string();
            (base, Vec::new())
        }
    };

    (base, args, unsigned)
}

impl TypeMapper for MySqlTypeMapper {
    fn parse_sql_type(&self, sql_type: &str) -> Option<ColumnType> {
        let (base, args, unsigned) = split_type(sql_type);

        match base.as_str() {
            "tinyint" if args.first() == Some(&1) => Some(ColumnType::Boolean),
            "bool" | "boolean" => Some(ColumnType::Boolean),
            "int" | "integer" | "mediumint" | "smallint" | "tinyint" => {
                Some(ColumnType::Integer { unsigned })
            }
            "bigint" => Some(ColumnType::BigInt { unsigned }),
            "varchar" | "char" => Some(ColumnType::Varchar {
                length: args.first().copied().unwrap_or(255),
            }),
            "text" | "tinytext" | "mediumtext" | "longtext" => Some(ColumnType::Text),
            "double" | "float" | "real" => Some(ColumnType::Double),
            "decimal" | "numeric" => Some(ColumnType::Decimal {
                precision: args.first().copied().unwrap_or(10),
                scale: args.get(1).copied().unwrap_or(0),
            }),
            "date" => Some(ColumnType::Date),
            "datetime" | "timestamp" => Some(ColumnType::DateTime),
            "json" => Some(ColumnType::Json),
            _ => None,
        }
    }
}

impl TypeMapper for SqliteTypeMapper {
    fn parse_sql_type(&self, sql_type: &str) -> Option<ColumnType> {
        let (base, args, unsigned) = split_type(sql_type);

        match base.as_str() {
            "integer" | "int" => Some(ColumnType::Integer { unsigned }),
            "bigint" => Some(ColumnType::BigInt { unsigned }),
            "boolean" | "bool" => Some(ColumnType::Boolean),
            "varchar" | "char" => Some(ColumnType::Varchar {
                length: args.first().copied().unwrap_or(255),
            }),
            "text" => Some(ColumnType::Text),
            "real" | "double" | "float" => Some(ColumnType::Double),
            "decimal" | "numeric" => Some(ColumnType::Decimal {
                precision: args.first().copied().unwrap_or(10),
                scale: args.get(1).copied().unwrap_or(0),
            }),
            "date" => Some(ColumnType::Date),
            "datetime" | "timestamp" => Some(ColumnType::DateTime),
            "json" => Some(ColumnType::Json),
            _ => None,
        }
    }
}
