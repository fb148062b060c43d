// モデル定義バリデーターサービス
//
// 登録されたモデル定義の整合性を検証するサービス。
// フィールド名の重複と命名、リレーション先、主キー、型パラメーターを検証します。

use crate::adapters::sql_quote::validate_identifier;
use crate::core::error::{ErrorLocation, ValidationError, ValidationResult};
use crate::core::field::{Field, FieldType};
use crate::core::model::{ModelCatalog, ModelDefinition};
use crate::core::naming::ID_FIELD;
use std::collections::HashSet;

/// モデル定義バリデーターサービス
#[derive(Debug, Clone, Default)]
pub struct ModelValidatorService {}

impl ModelValidatorService {
    /// 新しいModelValidatorServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// 全モデル定義を検証
    ///
    /// # Arguments
    ///
    /// * `catalog` - 検証対象のモデル定義の参照元
    ///
    /// # Returns
    ///
    /// 検証結果（エラーのリストを含む）
    pub fn validate_all(&self, catalog: &dyn ModelCatalog) -> ValidationResult {
        let mut result = ValidationResult::new();
        for name in catalog.model_names() {
            if let Some(definition) = catalog.model_definition(&name) {
                result.merge(self.validate(&definition, catalog));
            }
        }
        result
    }

    /// モデル定義を1件検証
    pub fn validate(
        &self,
        definition: &ModelDefinition,
        catalog: &dyn ModelCatalog,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();
        let model = definition.name.as_str();

        if validate_identifier(&definition.collection_name()).is_err() {
            result.add_error(ValidationError::Naming {
                message: format!(
                    "モデル名 '{}' からテーブル名 '{}' を作れません",
                    model,
                    definition.collection_name()
                ),
                location: Some(ErrorLocation::with_model(model)),
            });
        }

        let mut seen = HashSet::new();
        for field in &definition.fields {
            if !seen.insert(field.name.as_str()) {
                result.add_error(ValidationError::Constraint {
                    message: format!("フィールド '{}' が重複しています", field.name),
                    location: Some(ErrorLocation::with_field(model, &field.name)),
                    suggestion: Some("フィールド名を一意にしてください".to_string()),
                });
            }

            if validate_identifier(&field.name).is_err() {
                result.add_error(ValidationError::Naming {
                    message: format!("フィールド名 '{}' は識別子として使えません", field.name),
                    location: Some(ErrorLocation::with_field(model, &field.name)),
                });
            }

            self.validate_field(model, field, catalog, &mut result);
        }

        if !definition.data_fields().any(|f| f.primary) {
            result.add_error(ValidationError::Constraint {
                message: "プライマリキーが定義されていません".to_string(),
                location: Some(ErrorLocation::with_model(model)),
                suggestion: Some(format!(
                    "'{}' フィールドに primary: true を指定してください",
                    ID_FIELD
                )),
            });
        }

        result
    }

    fn validate_field(
        &self,
        model: &str,
        field: &Field,
        catalog: &dyn ModelCatalog,
        result: &mut ValidationResult,
    ) {
        let location = || Some(ErrorLocation::with_field(model, &field.name));

        match field.field_type {
            FieldType::String if field.length == Some(0) => {
                result.add_error(ValidationError::Constraint {
                    message: "文字列長は1以上である必要があります".to_string(),
                    location: location(),
                    suggestion: Some("length を省略すると255になります".to_string()),
                });
            }
            FieldType::Decimal => {
                if let (Some(precision), Some(scale)) = (field.precision, field.scale) {
                    if scale > precision {
                        result.add_error(ValidationError::Constraint {
                            message: format!(
                                "scale ({}) が precision ({}) を超えています",
                                scale, precision
                            ),
                            location: location(),
                            suggestion: None,
                        });
                    }
                }
            }
            FieldType::Relation => {
                let Some(target) = field.relation_model.as_deref() else {
                    result.add_error(ValidationError::Reference {
                        message: "リレーション先のモデルが指定されていません".to_string(),
                        location: location(),
                        suggestion: Some("relation_model を指定してください".to_string()),
                    });
                    return;
                };

                match catalog.model_definition(target) {
                    None => result.add_error(ValidationError::Reference {
                        message: format!("リレーション先のモデル '{}' が登録されていません", target),
                        location: location(),
                        suggestion: Some(format!("モデル '{}' を登録してください", target)),
                    }),
                    Some(related) if !related.has_field(ID_FIELD) => {
                        result.add_error(ValidationError::Reference {
                            message: format!(
                                "リレーション先のモデル '{}' に '{}' フィールドがありません",
                                target, ID_FIELD
                            ),
                            location: location(),
                            suggestion: None,
                        })
                    }
                    Some(_) => {}
                }

                if field.relation_type.is_none() {
                    result.add_warning(format!(
                        "{}.{}: relation_type が未指定のため複数値として扱います",
                        model, field.name
                    ));
                }
            }
            _ => {}
        }
    }
}
