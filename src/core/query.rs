// 汎用クエリ
//
// バックエンドに依存しないCRUD操作の記述です。
// クエリ種別、対象モデル、名前付きフィルターのチェーン、書き込みデータを保持し、
// Storageプラグインがそれぞれのバックエンド操作に変換します。

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// クエリ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryType {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
    Count,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Select => write!(f, "SELECT"),
            QueryType::Insert => write!(f, "INSERT"),
            QueryType::Update => write!(f, "UPDATE"),
            QueryType::Delete => write!(f, "DELETE"),
            QueryType::Count => write!(f, "COUNT"),
        }
    }
}

/// 並び順
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// 結合種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "inner"),
            JoinKind::Left => write!(f, "left"),
        }
    }
}

/// 名前付きフィルター
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    /// フィルター名
    pub name: String,
    /// フィルター引数
    pub params: Vec<Value>,
}

/// 汎用クエリ
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    query_type: QueryType,
    model: Option<String>,
    filters: Vec<QueryFilter>,
    data: BTreeMap<String, Value>,
}

impl Query {
    /// 新しいSELECTクエリを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 種別を指定してクエリを作成
    pub fn of_type(query_type: QueryType) -> Self {
        Self {
            query_type,
            ..Self::default()
        }
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    pub fn set_type(&mut self, query_type: QueryType) {
        self.query_type = query_type;
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = Some(model.into());
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn set_data(&mut self, data: BTreeMap<String, Value>) {
        self.data = data;
    }

    pub fn filters(&self) -> &[QueryFilter] {
        &self.filters
    }

    /// 指定された名前のフィルターを含むか
    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.iter().any(|f| f.name == name)
    }

    /// フィルターを追加
    pub fn add_filter(&mut self, name: impl Into<String>, params: Vec<Value>) {
        self.filters.push(QueryFilter {
            name: name.into(),
            params,
        });
    }

    /// フィルターを追加（チェーン用）
    pub fn filter(mut self, name: impl Into<String>, params: Vec<Value>) -> Self {
        self.add_filter(name, params);
        self
    }

    pub fn select(self, fields: &[&str]) -> Self {
        let params = fields.iter().map(|f| Value::from(*f)).collect();
        self.filter("select", params)
    }

    pub fn equal(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter("equal", vec![Value::from(field), value.into()])
    }

    /// 2つのカラムの一致条件
    pub fn equal_field(self, left: &str, right: &str) -> Self {
        self.filter(
            "equal",
            vec![Value::from(left), Value::from(right), Value::from("field")],
        )
    }

    pub fn not_equal(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter("not_equal", vec![Value::from(field), value.into()])
    }

    pub fn gt(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter("gt", vec![Value::from(field), value.into()])
    }

    pub fn gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter("gte", vec![Value::from(field), value.into()])
    }

    pub fn lt(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter("lt", vec![Value::from(field), value.into()])
    }

    pub fn lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter("lte", vec![Value::from(field), value.into()])
    }

    pub fn range(self, field: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.filter("range", vec![Value::from(field), min.into(), max.into()])
    }

    pub fn order(self, field: &str, direction: OrderDirection) -> Self {
        self.filter(
            "order",
            vec![Value::from(field), Value::from(direction.to_string())],
        )
    }

    pub fn limit(self, offset: u64, count: u64) -> Self {
        self.filter("limit", vec![Value::from(offset), Value::from(count)])
    }

    pub fn like(self, field: &str, pattern: &str) -> Self {
        self.filter("like", vec![Value::from(field), Value::from(pattern)])
    }

    pub fn in_list(self, field: &str, values: Vec<Value>) -> Self {
        self.filter("in", vec![Value::from(field), Value::Array(values)])
    }

    pub fn count(self, field: &str) -> Self {
        self.filter("count", vec![Value::from(field)])
    }

    /// 結合条件 `left = right` でテーブルを結合
    pub fn join(self, kind: JoinKind, table: &str, left: &str, right: &str) -> Self {
        self.filter(
            "join",
            vec![
                Value::from(kind.to_string()),
                Value::from(table),
                Value::from(left),
                Value::from(right),
            ],
        )
    }

    /// クエリ内容のハッシュ値（SHA-256の16進文字列）
    pub fn to_hash(&self) -> String {
        let digest = Sha256::digest(self.to_string().as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query_type)?;
        if let Some(model) = &self.model {
            write!(f, " {}", model)?;
        }
        for filter in &self.filters {
            let params: Vec<String> = filter.params.iter().map(|p| p.to_string()).collect();
            write!(f, " {}({})", filter.name, params.join(","))?;
        }
        if !self.data.is_empty() {
            let data: Vec<String> = self
                .data
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, " SET {}", data.join(","))?;
        }
        Ok(())
    }
}
