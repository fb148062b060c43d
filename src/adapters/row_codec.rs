// 値のバインドと行のデコード
//
// serde_json::Value と sqlx Anyドライバーの間の変換を行います。
// 読み込んだ値はフィールド定義に従って真偽値・JSONへ戻します。

use crate::core::field::{Field, FieldType};
use serde_json::{Number, Value};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Column, Row};
use std::collections::BTreeMap;

/// 値を1つバインド
pub fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &Value,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        // 配列・オブジェクトはJSON文字列として保存
        other => query.bind(other.to_string()),
    }
}

/// SQLに値をバインドしたクエリを作成
pub fn build_query<'q>(sql: &'q str, params: &[Value]) -> Query<'q, Any, AnyArguments<'q>> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, value| bind_value(query, value))
}

/// 行をカラム名 -> 値のマップに変換
pub fn row_to_map(row: &AnyRow) -> BTreeMap<String, Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| (column.name().to_string(), decode_column(row, index)))
        .collect()
}

/// カラム値をデコード
///
/// Anyドライバーは型情報が限定的なため、整数・浮動小数点・文字列・真偽値・バイト列の順に試します。
fn decode_column(row: &AnyRow, index: usize) -> Value {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return value
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null);
    }
    Value::Null
}

/// 読み込んだ値をフィールド型に合わせて変換
pub fn coerce_to_field(field: &Field, value: Value) -> Value {
    match (field.field_type, value) {
        (FieldType::Boolean, Value::Number(n)) => Value::Bool(n.as_i64().unwrap_or(0) != 0),
        (FieldType::Boolean, Value::String(s)) => {
            Value::Bool(matches!(s.as_str(), "1" | "true" | "TRUE"))
        }
        (FieldType::Array | FieldType::Object, Value::String(s)) => {
            serde_json::from_str(&s).unwrap_or(Value::String(s))
        }
        (FieldType::Decimal | FieldType::Float, Value::String(s)) => s
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(s)),
        (_, value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_boolean() {
        let field = Field::new("active", FieldType::Boolean);
        assert_eq!(coerce_to_field(&field, json!(1)), json!(true));
        assert_eq!(coerce_to_field(&field, json!(0)), json!(false));
        assert_eq!(coerce_to_field(&field, json!("1")), json!(true));
        assert_eq!(coerce_to_field(&field, Value::Null), Value::Null);
    }

    #[test]
    fn test_coerce_json() {
        let field = Field::new("tags", FieldType::Array);
        assert_eq!(coerce_to_field(&field, json!("[1,2]")), json!([1, 2]));
        assert_eq!(coerce_to_field(&field, json!("not json")), json!("not json"));
    }

    #[test]
    fn test_coerce_decimal() {
        let field = Field::new("price", FieldType::Decimal);
        assert_eq!(coerce_to_field(&field, json!("12.50")), json!(12.5));
    }

    #[test]
    fn test_other_values_untouched() {
        let field = Field::new("title", FieldType::String);
        assert_eq!(coerce_to_field(&field, json!("x")), json!("x"));
    }
}
