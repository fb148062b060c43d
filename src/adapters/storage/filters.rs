// クエリフィルター
//
// 汎用クエリのフィルター（名前 + 引数）をSQLクエリビルダーの操作に変換します。
// フィルターは名前で登録され、同名のフィルターは上書きされません。

use crate::adapters::query_builder::{CompareOp, SqlQueryBuilder, StatementKind};
use crate::core::error::QueryError;
use crate::core::query::{JoinKind, OrderDirection, QueryFilter};
use serde_json::Value;
use std::collections::BTreeMap;

/// フィルター関数
///
/// ビルダーと引数を受け取り、ビルダーを変更します。
pub type FilterFn = fn(&mut SqlQueryBuilder, &[Value]) -> Result<(), QueryError>;

/// フィルターレジストリ
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, FilterFn>,
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

impl FilterRegistry {
    /// 空のレジストリを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 組み込みフィルターを登録したレジストリを作成
    pub fn with_builtin_filters() -> Self {
        let mut registry = Self::new();
        registry.add_filter("select", filter_select);
        registry.add_filter("equal", filter_equal);
        registry.add_filter("equals", filter_equal);
        registry.add_filter("not_equal", filter_not_equal);
        registry.add_filter("gt", filter_gt);
        registry.add_filter("gte", filter_gte);
        registry.add_filter("lt", filter_lt);
        registry.add_filter("lte", filter_lte);
        registry.add_filter("range", filter_range);
        registry.add_filter("order", filter_order);
        registry.add_filter("limit", filter_limit);
        registry.add_filter("count", filter_count);
        registry.add_filter("like", filter_like);
        registry.add_filter("in", filter_in);
        registry.add_filter("join", filter_join);
        registry
    }

    /// フィルターを登録
    ///
    /// 既に同名のフィルターがある場合は登録せず false を返します。
    pub fn add_filter(&mut self, name: impl Into<String>, filter: FilterFn) -> bool {
        let name = name.into();
        if self.filters.contains_key(&name) {
            return false;
        }
        self.filters.insert(name, filter);
        true
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn get_filter(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).copied()
    }

    /// 登録済みのフィルター名（名前順）
    pub fn names(&self) -> Vec<String> {
        self.filters.keys().cloned().collect()
    }

    /// フィルターをビルダーに適用
    ///
    /// 未登録のフィルターは `QueryError::UnknownFilter` になります。
    pub fn apply(
        &self,
        builder: &mut SqlQueryBuilder,
        filter: &QueryFilter,
    ) -> Result<(), QueryError> {
        let filter_fn = self
            .get_filter(&filter.name)
            .ok_or_else(|| QueryError::UnknownFilter {
                name: filter.name.clone(),
            })?;
        filter_fn(builder, &filter.params)
    }
}

// =============================================================================
// 引数ヘルパー
// =============================================================================

fn param<'a>(filter: &str, params: &'a [Value], index: usize) -> Result<&'a Value, QueryError> {
    params.get(index).ok_or_else(|| {
        QueryError::invalid_params(filter, format!("missing parameter #{}", index + 1))
    })
}

fn param_str<'a>(filter: &str, params: &'a [Value], index: usize) -> Result<&'a str, QueryError> {
    param(filter, params, index)?.as_str().ok_or_else(|| {
        QueryError::invalid_params(filter, format!("parameter #{} must be a string", index + 1))
    })
}

fn param_u64(filter: &str, params: &[Value], index: usize) -> Result<u64, QueryError> {
    let value = param(filter, params, index)?;
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        QueryError::invalid_params(
            filter,
            format!("parameter #{} must be a non-negative integer", index + 1),
        )
    })
}

fn compare(
    filter: &str,
    op: CompareOp,
    builder: &mut SqlQueryBuilder,
    params: &[Value],
) -> Result<(), QueryError> {
    let field = param_str(filter, params, 0)?;
    let value = param(filter, params, 1)?.clone();
    builder.and_where_compare(field, op, value)?;
    Ok(())
}

// =============================================================================
// 組み込みフィルター
// =============================================================================

/// `select(field, ...)` 取得するカラムを指定
///
/// SELECT以外の文では何もしません。
fn filter_select(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    if builder.kind() != StatementKind::Select {
        return Ok(());
    }
    let columns = (0..params.len())
        .map(|i| param_str("select", params, i))
        .collect::<Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Err(QueryError::invalid_params("select", "at least one field is required"));
    }
    builder.select(&columns)?;
    Ok(())
}

/// `equal(field, value[, "field"])` 等価条件
///
/// 第3引数が `"field"` の場合、value を値ではなくカラム名として比較します。
fn filter_equal(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    if params.get(2).and_then(Value::as_str) == Some("field") {
        let left = param_str("equal", params, 0)?;
        let right = param_str("equal", params, 1)?;
        builder.and_where_columns(left, CompareOp::Eq, right)?;
        return Ok(());
    }
    compare("equal", CompareOp::Eq, builder, params)
}

fn filter_not_equal(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    compare("not_equal", CompareOp::Neq, builder, params)
}

fn filter_gt(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    compare("gt", CompareOp::Gt, builder, params)
}

fn filter_gte(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    compare("gte", CompareOp::Gte, builder, params)
}

fn filter_lt(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    compare("lt", CompareOp::Lt, builder, params)
}

fn filter_lte(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    compare("lte", CompareOp::Lte, builder, params)
}

fn filter_like(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    let field = param_str("like", params, 0)?;
    let pattern = param_str("like", params, 1)?;
    builder.and_where_compare(field, CompareOp::Like, Value::from(pattern))?;
    Ok(())
}

/// `range(field, min, max)` 両端を含む範囲条件
fn filter_range(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    let field = param_str("range", params, 0)?;
    let min = param("range", params, 1)?.clone();
    let max = param("range", params, 2)?.clone();
    builder.and_where_between(field, min, max)?;
    Ok(())
}

/// `order(field[, "asc"|"desc"])` 並び順（複数指定で追加）
fn filter_order(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    let field = param_str("order", params, 0)?;
    let direction = match params.get(1) {
        None | Some(Value::Null) => OrderDirection::Asc,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("asc") => OrderDirection::Asc,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("desc") => OrderDirection::Desc,
        Some(other) => {
            return Err(QueryError::invalid_params(
                "order",
                format!("invalid direction {}", other),
            ))
        }
    };
    builder.add_order_by(field, direction)?;
    Ok(())
}

/// `limit(offset, count)`
fn filter_limit(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    let offset = param_u64("limit", params, 0)?;
    let count = param_u64("limit", params, 1)?;
    builder.set_first_result(offset).set_max_results(count);
    Ok(())
}

/// `count([field])` 件数の取得（既定は `id`）
fn filter_count(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    if builder.kind() != StatementKind::Select {
        return Ok(());
    }
    let field = match params.first() {
        None => "id",
        Some(_) => param_str("count", params, 0)?,
    };
    builder.select_count(field)?;
    Ok(())
}

/// `in(field, values)` values は配列またはカンマ区切り文字列
fn filter_in(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    let field = param_str("in", params, 0)?;
    let values = match param("in", params, 1)? {
        Value::Array(values) => values.clone(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => s
            .split(',')
            .map(|part| Value::from(part.trim()))
            .collect(),
        other => vec![other.clone()],
    };
    builder.and_where_in(field, values)?;
    Ok(())
}

/// `join(kind, table, left, right)` 結合条件 `left = right` でテーブルを結合
fn filter_join(builder: &mut SqlQueryBuilder, params: &[Value]) -> Result<(), QueryError> {
    let kind = match param_str("join", params, 0)?.to_lowercase().as_str() {
        "inner" => JoinKind::Inner,
        "left" => JoinKind::Left,
        other => {
            return Err(QueryError::invalid_params(
                "join",
                format!("unsupported join kind '{}'", other),
            ))
        }
    };
    let table = param_str("join", params, 1)?;
    let left = param_str("join", params, 2)?;
    let right = param_str("join", params, 3)?;
    builder.join(kind, table, left, right)?;
    Ok(())
}
