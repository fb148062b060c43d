// SQLクエリビルダー
//
// Storageのフィルターが操作するバックエンド側のクエリビルダーです。
// SELECT / INSERT / UPDATE / DELETE を組み立て、`?` プレースホルダー付きのSQLと
// バインドする値のリストを生成します。識別子はすべて検証・クォートされます。

use crate::adapters::sql_quote::{
    quote_identifier, quote_qualified, validate_identifier, validate_qualified_identifier,
};
use crate::core::config::Dialect;
use crate::core::error::QueryError;
use crate::core::query::{JoinKind, OrderDirection};
use serde_json::Value;

/// 文の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// 比較演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl CompareOp {
    fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
        }
    }
}

/// SQLクエリビルダー
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    dialect: Dialect,
    kind: StatementKind,
    table: Option<String>,
    alias: Option<String>,
    select: Vec<String>,
    joins: Vec<String>,
    wheres: Vec<String>,
    where_params: Vec<Value>,
    assignments: Vec<(String, Value)>,
    order_by: Vec<String>,
    first_result: Option<u64>,
    max_results: Option<u64>,
}

impl SqlQueryBuilder {
    /// 新しいビルダーを作成（既定はSELECT）
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            kind: StatementKind::Select,
            table: None,
            alias: None,
            select: Vec::new(),
            joins: Vec::new(),
            wheres: Vec::new(),
            where_params: Vec::new(),
            assignments: Vec::new(),
            order_by: Vec::new(),
            first_result: None,
            max_results: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// SELECT句を置き換え
    pub fn select(&mut self, columns: &[&str]) -> Result<&mut Self, QueryError> {
        self.select.clear();
        for column in columns {
            self.add_select(column)?;
        }
        Ok(self)
    }

    /// SELECT句にカラムを追加
    pub fn add_select(&mut self, column: &str) -> Result<&mut Self, QueryError> {
        validate_qualified_identifier(column)?;
        self.kind = StatementKind::Select;
        self.select.push(quote_qualified(self.dialect, column));
        Ok(self)
    }

    /// SELECT句を `COUNT(column) AS count` に置き換え
    pub fn select_count(&mut self, column: &str) -> Result<&mut Self, QueryError> {
        validate_qualified_identifier(column)?;
        self.kind = StatementKind::Select;
        self.select = vec![format!(
            "COUNT({}) AS count",
            quote_qualified(self.dialect, column)
        )];
        Ok(self)
    }

    /// FROM句を設定
    pub fn from(&mut self, table: &str, alias: Option<&str>) -> Result<&mut Self, QueryError> {
        validate_identifier(table)?;
        if let Some(alias) = alias {
            validate_identifier(alias)?;
        }
        self.table = Some(table.to_string());
        self.alias = alias.map(str::to_string);
        Ok(self)
    }

    /// DELETE文に切り替え
    pub fn delete(&mut self, table: &str) -> Result<&mut Self, QueryError> {
        validate_identifier(table)?;
        self.kind = StatementKind::Delete;
        self.table = Some(table.to_string());
        Ok(self)
    }

    /// UPDATE文に切り替え
    pub fn update(&mut self, table: &str) -> Result<&mut Self, QueryError> {
        validate_identifier(table)?;
        self.kind = StatementKind::Update;
        self.table = Some(table.to_string());
        Ok(self)
    }

    /// INSERT文に切り替え
    pub fn insert_into(&mut self, table: &str) -> Result<&mut Self, QueryError> {
        validate_identifier(table)?;
        self.kind = StatementKind::Insert;
        self.table = Some(table.to_string());
        Ok(self)
    }

    /// UPDATE文のSET句を追加
    pub fn set(&mut self, column: &str, value: Value) -> Result<&mut Self, QueryError> {
        validate_identifier(column)?;
        self.assignments.push((column.to_string(), value));
        Ok(self)
    }

    /// INSERT文の値を追加
    pub fn value(&mut self, column: &str, value: Value) -> Result<&mut Self, QueryError> {
        self.set(column, value)
    }

    /// 生のWHERE条件をANDで追加
    ///
    /// `expression` 内の `?` の数と `params` の数は一致している必要があります。
    pub fn and_where(
        &mut self,
        expression: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<&mut Self, QueryError> {
        let expression = expression.into();
        let placeholders = expression.matches('?').count();
        if placeholders != params.len() {
            return Err(QueryError::Incomplete {
                message: format!(
                    "expression '{}' has {} placeholders but {} parameters were given",
                    expression,
                    placeholders,
                    params.len()
                ),
            });
        }
        self.wheres.push(expression);
        self.where_params.extend(params);
        Ok(self)
    }

    /// カラムと値の比較条件を追加
    ///
    /// NULLとの等価・非等価比較は `IS NULL` / `IS NOT NULL` に変換します。
    pub fn and_where_compare(
        &mut self,
        column: &str,
        op: CompareOp,
        value: Value,
    ) -> Result<&mut Self, QueryError> {
        validate_qualified_identifier(column)?;
        let column_sql = quote_qualified(self.dialect, column);

        match (op, value.is_null()) {
            (CompareOp::Eq, true) => self.and_where(format!("{} IS NULL", column_sql), vec![]),
            (CompareOp::Neq, true) => {
                self.and_where(format!("{} IS NOT NULL", column_sql), vec![])
            }
            _ => self.and_where(format!("{} {} ?", column_sql, op.as_sql()), vec![value]),
        }
    }

    /// 2つのカラムの比較条件を追加
    pub fn and_where_columns(
        &mut self,
        left: &str,
        op: CompareOp,
        right: &str,
    ) -> Result<&mut Self, QueryError> {
        validate_qualified_identifier(left)?;
        validate_qualified_identifier(right)?;
        let expression = format!(
            "{} {} {}",
            quote_qualified(self.dialect, left),
            op.as_sql(),
            quote_qualified(self.dialect, right)
        );
        self.and_where(expression, vec![])
    }

    /// 範囲条件（両端を含む）を追加
    pub fn and_where_between(
        &mut self,
        column: &str,
        min: Value,
        max: Value,
    ) -> Result<&mut Self, QueryError> {
        validate_qualified_identifier(column)?;
        let column_sql = quote_qualified(self.dialect, column);
        self.and_where(
            format!("({} >= ? AND {} <= ?)", column_sql, column_sql),
            vec![min, max],
        )
    }

    /// IN条件を追加（空のリストは常に偽）
    pub fn and_where_in(
        &mut self,
        column: &str,
        values: Vec<Value>,
    ) -> Result<&mut Self, QueryError> {
        validate_qualified_identifier(column)?;
        if values.is_empty() {
            return self.and_where("1 = 0", vec![]);
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let expression = format!(
            "{} IN ({})",
            quote_qualified(self.dialect, column),
            placeholders
        );
        self.and_where(expression, values)
    }

    /// 結合を追加（`left = right` を結合条件とする）
    pub fn join(
        &mut self,
        kind: JoinKind,
        table: &str,
        left: &str,
        right: &str,
    ) -> Result<&mut Self, QueryError> {
        validate_identifier(table)?;
        validate_qualified_identifier(left)?;
        validate_qualified_identifier(right)?;

        let keyword = match kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        };
        self.joins.push(format!(
            "{} {} ON {} = {}",
            keyword,
            quote_identifier(self.dialect, table),
            quote_qualified(self.dialect, left),
            quote_qualified(self.dialect, right)
        ));
        Ok(self)
    }

    pub fn inner_join(&mut self, table: &str, left: &str, right: &str) -> Result<&mut Self, QueryError> {
        self.join(JoinKind::Inner, table, left, right)
    }

    pub fn left_join(&mut self, table: &str, left: &str, right: &str) -> Result<&mut Self, QueryError> {
        self.join(JoinKind::Left, table, left, right)
    }

    /// ORDER BY句を置き換え
    pub fn order_by(
        &mut self,
        column: &str,
        direction: OrderDirection,
    ) -> Result<&mut Self, QueryError> {
        self.order_by.clear();
        self.add_order_by(column, direction)
    }

    /// ORDER BY句を追加
    pub fn add_order_by(
        &mut self,
        column: &str,
        direction: OrderDirection,
    ) -> Result<&mut Self, QueryError> {
        validate_qualified_identifier(column)?;
        self.order_by
            .push(format!("{} {}", quote_qualified(self.dialect, column), direction));
        Ok(self)
    }

    /// 取得開始位置
    pub fn set_first_result(&mut self, offset: u64) -> &mut Self {
        self.first_result = Some(offset);
        self
    }

    /// 最大取得件数
    pub fn set_max_results(&mut self, count: u64) -> &mut Self {
        self.max_results = Some(count);
        self
    }

    /// SQLとバインド値を生成
    pub fn to_sql(&self) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.table.as_deref().ok_or_else(|| QueryError::Incomplete {
            message: "no table specified".to_string(),
        })?;
        let table_sql = quote_identifier(self.dialect, table);

        match self.kind {
            StatementKind::Select => Ok(self.build_select(&table_sql)),
            StatementKind::Insert => Ok(self.build_insert(&table_sql)),
            StatementKind::Update => self.build_update(&table_sql),
            StatementKind::Delete => self.build_delete(&table_sql),
        }
    }

    fn build_select(&self, table_sql: &str) -> (String, Vec<Value>) {
        let columns = if self.select.is_empty() {
            "*".to_string()
        } else {
            self.select.join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", columns, table_sql);
        if let Some(alias) = &self.alias {
            sql.push_str(&format!(" AS {}", quote_identifier(self.dialect, alias)));
        }
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        self.push_where(&mut sql);
        self.push_order(&mut sql);

        match (self.max_results, self.first_result) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => {
                // OFFSETのみの指定はLIMITが必須
                let unbounded = match self.dialect {
                    Dialect::MySQL => "18446744073709551615",
                    Dialect::SQLite => "-1",
                };
                sql.push_str(&format!(" LIMIT {} OFFSET {}", unbounded, offset))
            }
            (None, None) => {}
        }

        (sql, self.where_params.clone())
    }

    fn build_insert(&self, table_sql: &str) -> (String, Vec<Value>) {
        if self.assignments.is_empty() {
            let sql = match self.dialect {
                Dialect::MySQL => format!("INSERT INTO {} () VALUES ()", table_sql),
                Dialect::SQLite => format!("INSERT INTO {} DEFAULT VALUES", table_sql),
            };
            return (sql, Vec::new());
        }

        let columns: Vec<String> = self
            .assignments
            .iter()
            .map(|(c, _)| quote_identifier(self.dialect, c))
            .collect();
        let placeholders = vec!["?"; self.assignments.len()].join(", ");
        let values: Vec<Value> = self.assignments.iter().map(|(_, v)| v.clone()).collect();

        (
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table_sql,
                columns.join(", "),
                placeholders
            ),
            values,
        )
    }

    fn build_update(&self, table_sql: &str) -> Result<(String, Vec<Value>), QueryError> {
        if self.assignments.is_empty() {
            return Err(QueryError::Incomplete {
                message: "UPDATE without any column to set".to_string(),
            });
        }
        self.ensure_single_table_modification("UPDATE")?;

        let sets: Vec<String> = self
            .assignments
            .iter()
            .map(|(c, _)| format!("{} = ?", quote_identifier(self.dialect, c)))
            .collect();
        let mut params: Vec<Value> = self.assignments.iter().map(|(_, v)| v.clone()).collect();
        params.extend(self.where_params.iter().cloned());

        let mut sql = format!("UPDATE {} SET {}", table_sql, sets.join(", "));
        self.push_where(&mut sql);
        self.push_modification_limit(&mut sql);
        Ok((sql, params))
    }

    fn build_delete(&self, table_sql: &str) -> Result<(String, Vec<Value>), QueryError> {
        self.ensure_single_table_modification("DELETE")?;

        let mut sql = format!("DELETE FROM {}", table_sql);
        self.push_where(&mut sql);
        self.push_modification_limit(&mut sql);
        Ok((sql, self.where_params.clone()))
    }

    /// UPDATE/DELETEで使用できない句の検証
    ///
    /// 結合とOFFSETは全方言で不可、ORDER BY/LIMITはMySQLのみ可。
    fn ensure_single_table_modification(&self, statement: &str) -> Result<(), QueryError> {
        if !self.joins.is_empty() {
            return Err(QueryError::Incomplete {
                message: format!("{} does not support joins", statement),
            });
        }
        if self.first_result.is_some_and(|offset| offset > 0) {
            return Err(QueryError::Incomplete {
                message: format!("{} does not support an offset", statement),
            });
        }
        if self.dialect == Dialect::SQLite
            && (self.max_results.is_some() || !self.order_by.is_empty())
        {
            return Err(QueryError::Incomplete {
                message: format!("{} with ORDER BY or LIMIT is not supported by sqlite", statement),
            });
        }
        Ok(())
    }

    fn push_where(&self, sql: &mut String) {
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.join(" AND "));
        }
    }

    fn push_order(&self, sql: &mut String) {
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
    }

    fn push_modification_limit(&self, sql: &mut String) {
        self.push_order(sql);
        if let Some(limit) = self.max_results {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_all() {
        let mut qb = SqlQueryBuilder::new(Dialect::MySQL);
        qb.from("node", None).unwrap();

        let (sql, params) = qb.to_sql().unwrap();
        assert_eq!(sql, "SELECT * FROM `node`");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_with_where_order_limit() {
        let mut qb = SqlQueryBuilder::new(Dialect::MySQL);
        qb.from("node", None).unwrap();
        qb.and_where_compare("title", CompareOp::Eq, json!("Hello"))
            .unwrap();
        qb.and_where_compare("id", CompareOp::Gt, json!(3)).unwrap();
        qb.order_by("id", OrderDirection::Desc).unwrap();
        qb.set_first_result(10).set_max_results(5);

        let (sql, params) = qb.to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `node` WHERE `title` = ? AND `id` > ? ORDER BY `id` DESC LIMIT 5 OFFSET 10"
        );
        assert_eq!(params, vec![json!("Hello"), json!(3)]);
    }

    #[test]
    fn test_null_comparison() {
        let mut qb = SqlQueryBuilder::new(Dialect::SQLite);
        qb.from("node", None).unwrap();
        qb.and_where_compare("parent", CompareOp::Eq, Value::Null)
            .unwrap();
        qb.and_where_compare("title", CompareOp::Neq, Value::Null)
            .unwrap();

        let (sql, params) = qb.to_sql().unwrap();
        assert_eq!(
            sql,
            r#"SELECT * FROM "node" WHERE "parent" IS NULL AND "title" IS NOT NULL"#
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_in_and_between() {
        let mut qb = SqlQueryBuilder::new(Dialect::MySQL);
        qb.from("node", None).unwrap();
        qb.and_where_in("id", vec![json!(1), json!(2)]).unwrap();
        qb.and_where_between("views", json!(10), json!(20)).unwrap();

        let (sql, params) = qb.to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `node` WHERE `id` IN (?, ?) AND (`views` >= ? AND `views` <= ?)"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_empty_in_is_false() {
        let mut qb = SqlQueryBuilder::new(Dialect::MySQL);
        qb.from("node", None).unwrap();
        qb.and_where_in("id", vec![]).unwrap();

        let (sql, _) = qb.to_sql().unwrap();
        assert!(sql.ends_with("WHERE 1 = 0"));
    }

    #[test]
    fn test_join_and_count() {
        let mut qb = SqlQueryBuilder::new(Dialect::MySQL);
        qb.from("tag", None).unwrap();
        qb.select_count("tag.id").unwrap();
        qb.inner_join("node_rel", "node_rel.tags_id", "tag.id")
            .unwrap();

        let (sql, _) = qb.to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(`tag`.`id`) AS count FROM `tag` INNER JOIN `node_rel` ON `node_rel`.`tags_id` = `tag`.`id`"
        );
    }

    #[test]
    fn test_left_join() {
        let mut qb = SqlQueryBuilder::new(Dialect::SQLite);
        qb.from("node", None).unwrap();
        qb.left_join("node_rel", "node_rel.node_id", "node.id")
            .unwrap();

        let (sql, _) = qb.to_sql().unwrap();
        assert_eq!(
            sql,
            r#"SELECT * FROM "node" LEFT JOIN "node_rel" ON "node_rel"."node_id" = "node"."id""#
        );
    }

    #[test]
    fn test_insert() {
        let mut qb = SqlQueryBuilder::new(Dialect::SQLite);
        qb.insert_into("node").unwrap();
        qb.value("title", json!("A")).unwrap();
        qb.value("views", json!(2)).unwrap();

        let (sql, params) = qb.to_sql().unwrap();
        assert_eq!(sql, r#"INSERT INTO "node" ("title", "views") VALUES (?, ?)"#);
        assert_eq!(params, vec![json!("A"), json!(2)]);
    }

    #[test]
    fn test_insert_without_values() {
        let mut qb = SqlQueryBuilder::new(Dialect::SQLite);
        qb.insert_into("node").unwrap();
        let (sql, _) = qb.to_sql().unwrap();
        assert_eq!(sql, r#"INSERT INTO "node" DEFAULT VALUES"#);
    }

    #[test]
    fn test_update_params_order() {
        let mut qb = SqlQueryBuilder::new(Dialect::MySQL);
        qb.update("node").unwrap();
        qb.set("title", json!("B")).unwrap();
        qb.and_where_compare("id", CompareOp::Eq, json!(7)).unwrap();

        let (sql, params) = qb.to_sql().unwrap();
        assert_eq!(sql, "UPDATE `node` SET `title` = ? WHERE `id` = ?");
        assert_eq!(params, vec![json!("B"), json!(7)]);
    }

    #[test]
    fn test_update_without_set_fails() {
        let mut qb = SqlQueryBuilder::new(Dialect::MySQL);
        qb.update("node").unwrap();
        assert!(qb.to_sql().is_err());
    }

    #[test]
    fn test_delete_with_limit() {
        let mut qb = SqlQueryBuilder::new(Dialect::MySQL);
        qb.delete("node").unwrap();
        qb.set_first_result(0).set_max_results(1);
        let (sql, _) = qb.to_sql().unwrap();
        assert_eq!(sql, "DELETE FROM `node` LIMIT 1");

        let mut qb = SqlQueryBuilder::new(Dialect::SQLite);
        qb.delete("node").unwrap();
        qb.set_max_results(1);
        assert!(qb.to_sql().is_err());
    }

    #[test]
    fn test_rejects_injection_in_identifiers() {
        let mut qb = SqlQueryBuilder::new(Dialect::MySQL);
        assert!(qb.from("node; DROP TABLE node", None).is_err());
        assert!(qb
            .and_where_compare("id = 1 OR 1", CompareOp::Eq, json!(1))
            .is_err());
    }

    #[test]
    fn test_and_where_placeholder_mismatch() {
        let mut qb = SqlQueryBuilder::new(Dialect::MySQL);
        assert!(qb.and_where("a = ? AND b = ?", vec![json!(1)]).is_err());
    }

    #[test]
    fn test_missing_table() {
        let qb = SqlQueryBuilder::new(Dialect::MySQL);
        assert!(qb.to_sql().is_err());
    }
}
