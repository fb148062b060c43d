// スキーマ反映サービス
//
// モデル定義のフィールドからテーブル・カラム・インデックス定義を組み立てます。
// リレーションフィールドを持つモデルには、関連IDを保持するリレーションテーブルを追加します。

use crate::adapters::sql_quote::quote_literal;
use crate::core::field::{Field, FieldType};
use crate::core::model::{ModelCatalog, ModelDefinition};
use crate::core::naming::{self, ID_FIELD};
use crate::core::schema::{Column, ColumnType, Index, Schema, Table};
use serde_json::Value;
use tracing::warn;

/// 文字列フィールドの既定長
pub const DEFAULT_VARCHAR_LENGTH: u32 = 255;

/// 固定小数点数の既定の全体桁数
pub const DEFAULT_DECIMAL_PRECISION: u32 = 10;

/// 反映結果
#[derive(Debug, Clone, Default)]
pub struct ReflectedSchema {
    /// 目標スキーマ
    pub schema: Schema,
    /// 反映できなかった定義についての警告
    pub warnings: Vec<String>,
}

/// スキーマ反映サービス
#[derive(Debug, Clone, Default)]
pub struct SchemaReflector {
    table_prefix: String,
}

impl SchemaReflector {
    /// 新しいSchemaReflectorを作成
    pub fn new(table_prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: table_prefix.into(),
        }
    }

    /// モデル定義群をスキーマに反映
    ///
    /// # Arguments
    ///
    /// * `models` - 反映するモデル定義
    /// * `catalog` - リレーション先のモデル定義の参照元
    ///
    /// # Returns
    ///
    /// 目標スキーマと警告
    pub fn reflect(&self, models: &[ModelDefinition], catalog: &dyn ModelCatalog) -> ReflectedSchema {
        let mut reflected = ReflectedSchema::default();

        for definition in models {
            reflected.schema.add_table(self.reflect_table(definition));

            if let Some(relation_table) =
                self.reflect_relation_table(definition, catalog, &mut reflected.warnings)
            {
                reflected.schema.add_table(relation_table);
            }
        }

        reflected
    }

    /// モデルのテーブル定義を組み立て
    pub fn reflect_table(&self, definition: &ModelDefinition) -> Table {
        let table_name = naming::table_name(&self.table_prefix, &definition.name);
        let mut table = Table::new(&table_name);

        for field in definition.data_fields() {
            table.add_column(field_column(field));
        }

        table.set_primary_key(
            definition
                .data_fields()
                .filter(|f| f.primary)
                .map(|f| f.name.clone())
                .collect(),
        );

        for field in definition.data_fields().filter(|f| f.unique && !f.primary) {
            table.add_index(Index::new(
                format!("uniq_{}_{}", table_name, field.name),
                vec![field.name.clone()],
                true,
            ));
        }

        table
    }

    /// リレーションテーブルの定義を組み立て
    ///
    /// リレーションフィールドがないモデルは None を返します。
    fn reflect_relation_table(
        &self,
        definition: &ModelDefinition,
        catalog: &dyn ModelCatalog,
        warnings: &mut Vec<String>,
    ) -> Option<Table> {
        if definition.relation_fields().next().is_none() {
            return None;
        }

        let table_name = naming::relation_table_name(&self.table_prefix, &definition.name);
        let owner_column = naming::owner_id_column(&definition.name);
        let mut table = Table::new(&table_name);

        let mut owner = id_column(definition, &owner_column);
        owner.nullable = false;
        table.add_column(owner);

        for field in definition.relation_fields() {
            let related = field
                .relation_model
                .as_deref()
                .and_then(|name| catalog.model_definition(name));

            match related {
                Some(related) if related.has_field(ID_FIELD) => {
                    let mut column = id_column(&related, &naming::relation_id_column(&field.name));
                    column.nullable = true;
                    table.add_column(column);
                }
                _ => {
                    let message = format!(
                        "Relation field '{}.{}' references an unknown model '{}'; column skipped",
                        definition.name,
                        field.name,
                        field.relation_model.as_deref().unwrap_or_default()
                    );
                    warn!(model = %definition.name, field = %field.name, "Skipped relation column");
                    warnings.push(message);
                }
            }
        }

        table.add_index(Index::new(
            format!("idx_{}_{}", table_name, owner_column),
            vec![owner_column],
            false,
        ));

        Some(table)
    }
}

/// IDフィールドと同じ型のカラムを作成（自動増分なし）
fn id_column(definition: &ModelDefinition, column_name: &str) -> Column {
    let column_type = definition
        .get_field(ID_FIELD)
        .map(column_type)
        .unwrap_or(ColumnType::Integer { unsigned: true });
    Column::new(column_name, column_type, false)
}

/// フィールドをカラムに変換
pub fn field_column(field: &Field) -> Column {
    let column_type = column_type(field);
    let default_value = match column_type {
        ColumnType::Text | ColumnType::Json => None,
        _ => field.default.as_ref().and_then(default_literal),
    };

    Column {
        name: field.name.clone(),
        column_type,
        nullable: field.nullable && !field.primary,
        auto_increment: field.auto_increment,
        default_value,
    }
}

/// フィールド型をカラム型に変換
pub fn column_type(field: &Field) -> ColumnType {
    match field.field_type {
        FieldType::String => ColumnType::Varchar {
            length: field.length.unwrap_or(DEFAULT_VARCHAR_LENGTH),
        },
        FieldType::LongString => ColumnType::Text,
        FieldType::Integer => ColumnType::Integer {
            unsigned: field.unsigned,
        },
        FieldType::BigInteger => ColumnType::BigInt {
            unsigned: field.unsigned,
        },
        FieldType::Float => ColumnType::Double,
        FieldType::Decimal => ColumnType::Decimal {
            precision: field.precision.unwrap_or(DEFAULT_DECIMAL_PRECISION),
            scale: field.scale.unwrap_or(0),
        },
        FieldType::Boolean => ColumnType::Boolean,
        FieldType::Date => ColumnType::Date,
        FieldType::DateTime => ColumnType::DateTime,
        FieldType::Array | FieldType::Object | FieldType::Relation => ColumnType::Json,
    }
}

/// 初期値をSQLリテラルに変換
fn default_literal(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some("0".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(quote_literal(s)),
    }
}
