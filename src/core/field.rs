// フィールド定義
//
// モデルを構成する型付きフィールドの定義を提供します。
// リレーションフィールドは関連モデル名とリレーション種別を保持します。

use crate::core::naming::ID_FIELD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// フィールド型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 可変長文字列
    String,
    /// 長文テキスト
    LongString,
    /// 整数
    Integer,
    /// 64ビット整数
    BigInteger,
    /// 浮動小数点数
    Float,
    /// 固定小数点数
    Decimal,
    /// 真偽値
    Boolean,
    /// 日付
    Date,
    /// 日時
    DateTime,
    /// 配列（JSONとして保存）
    Array,
    /// オブジェクト（JSONとして保存）
    Object,
    /// 他モデルへのリレーション
    Relation,
}

/// リレーション種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    BelongsToOne,
    BelongsToMany,
    HasOne,
    HasMany,
}

impl RelationType {
    /// 単一のインスタンスを返すリレーションかどうか
    pub fn is_single(&self) -> bool {
        matches!(self, RelationType::BelongsToOne | RelationType::HasOne)
    }
}

/// フィールド定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// フィールド名
    pub name: String,

    /// フィールド型
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// 文字列長
    #[serde(default)]
    pub length: Option<u32>,

    /// 固定小数点数の全体桁数
    #[serde(default)]
    pub precision: Option<u32>,

    /// 固定小数点数の小数部桁数
    #[serde(default)]
    pub scale: Option<u32>,

    /// 符号なし
    #[serde(default)]
    pub unsigned: bool,

    /// 自動増分
    #[serde(default)]
    pub auto_increment: bool,

    /// プライマリキーを構成する
    #[serde(default)]
    pub primary: bool,

    /// 一意制約
    #[serde(default)]
    pub unique: bool,

    /// NULL許可
    #[serde(default = "default_nullable")]
    pub nullable: bool,

    /// 新規インスタンスの初期値
    #[serde(default)]
    pub default: Option<Value>,

    /// 関連モデル名（リレーションのみ）
    #[serde(default)]
    pub relation_model: Option<String>,

    /// リレーション種別（リレーションのみ）
    #[serde(default)]
    pub relation_type: Option<RelationType>,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    /// 新しいフィールドを作成
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            length: None,
            precision: None,
            scale: None,
            unsigned: false,
            auto_increment: false,
            primary: false,
            unique: false,
            nullable: true,
            default: None,
            relation_model: None,
            relation_type: None,
        }
    }

    /// 全モデル共通のIDフィールド
    pub fn id() -> Self {
        let mut field = Self::new(ID_FIELD, FieldType::Integer);
        field.unsigned = true;
        field.auto_increment = true;
        field.primary = true;
        field.nullable = false;
        field
    }

    /// リレーションフィールドを作成
    pub fn relation(
        name: impl Into<String>,
        relation_model: impl Into<String>,
        relation_type: RelationType,
    ) -> Self {
        let mut field = Self::new(name, FieldType::Relation);
        field.relation_model = Some(relation_model.into());
        field.relation_type = Some(relation_type);
        field
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// リレーションフィールドかどうか
    pub fn is_relation(&self) -> bool {
        self.field_type == FieldType::Relation
    }

    /// 単一インスタンスのリレーションかどうか
    pub fn is_single_relation(&self) -> bool {
        self.relation_type.is_some_and(|t| t.is_single())
    }
}
