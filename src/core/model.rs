// モデル定義とモデルインスタンス
//
// ModelDefinition はModelプラグインのフィールド構成を表し、
// Model はその定義に従って読み書きされるデータ保持用のインスタンスです。

use crate::core::field::Field;
use crate::core::naming::{self, ID_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// モデル定義
///
/// Modelプラグインの名前とフィールドのリストを保持します。
/// `id` フィールドは常に存在します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// モデル名
    pub name: String,

    /// フィールド定義のリスト
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl ModelDefinition {
    /// 新しいモデル定義を作成（IDフィールド付き）
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![Field::id()],
        }
    }

    /// フィールドを追加（同名のフィールドは置き換える）
    pub fn add_field(&mut self, field: Field) {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
    }

    /// ビルダー形式でフィールドを追加
    pub fn with_field(mut self, field: Field) -> Self {
        self.add_field(field);
        self
    }

    /// IDフィールドがなければ先頭に追加
    pub fn ensure_id_field(&mut self) {
        if !self.has_field(ID_FIELD) {
            self.fields.insert(0, Field::id());
        }
    }

    /// 指定されたフィールドが存在するか確認
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// 指定されたフィールドを取得
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// リレーションフィールドのみを取得
    pub fn relation_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_relation())
    }

    /// 永続化対象（リレーション以外）のフィールドを取得
    pub fn data_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_relation())
    }

    /// コレクション名
    pub fn collection_name(&self) -> String {
        naming::collection_name(&self.name)
    }

    /// 既定値を適用したインスタンスを作成し、データで上書き
    pub fn instantiate(&self, data: BTreeMap<String, Value>) -> Model {
        let mut model = Model::new(&self.name);
        for field in self.data_fields() {
            if let Some(default) = &field.default {
                model.set(&field.name, default.clone());
            }
        }
        model.populate(data);
        model
    }
}

/// モデル定義の参照元
///
/// ストレージはこのトレイトを通じて、拡張を反映したモデル定義を取得します。
pub trait ModelCatalog: Send + Sync {
    /// モデル定義を取得（未登録の場合は None）
    fn model_definition(&self, model_name: &str) -> Option<ModelDefinition>;

    /// 登録済みのモデル名
    fn model_names(&self) -> Vec<String>;
}

/// モデルインスタンス
///
/// モデル名とフィールド名 -> 値のマップを保持します。
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    model_name: String,
    data: BTreeMap<String, Value>,
}

impl Model {
    /// 空のインスタンスを作成（IDはnull）
    pub fn new(model_name: impl Into<String>) -> Self {
        let mut data = BTreeMap::new();
        data.insert(ID_FIELD.to_string(), Value::Null);
        Self {
            model_name: model_name.into(),
            data,
        }
    }

    /// データ付きのインスタンスを作成
    pub fn with_data(model_name: impl Into<String>, data: BTreeMap<String, Value>) -> Self {
        let mut model = Self::new(model_name);
        model.populate(data);
        model
    }

    /// モデル名
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// データで上書き
    pub fn populate(&mut self, data: BTreeMap<String, Value>) {
        for (name, value) in data {
            self.data.insert(name, value);
        }
    }

    /// 値を取得
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// 値を設定
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.data.insert(name.to_string(), value.into());
    }

    /// 値を削除
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.data.remove(name)
    }

    /// 値がnull以外で設定されているか
    pub fn has(&self, name: &str) -> bool {
        self.data.get(name).is_some_and(|v| !v.is_null())
    }

    /// IDを取得（未設定・空の場合はNone）
    pub fn id(&self) -> Option<&Value> {
        self.data.get(ID_FIELD).filter(|v| !is_empty_value(v))
    }

    /// IDを設定
    pub fn set_id(&mut self, id: impl Into<Value>) {
        self.set(ID_FIELD, id);
    }

    /// 未保存のインスタンスかどうか
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// データのマップを取得
    pub fn to_map(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// JSON値に変換
    pub fn to_json(&self) -> Value {
        let object: Map<String, Value> = self
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(object)
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string_pretty(&self.to_json()) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{}", self.model_name),
        }
    }
}

/// 値が「空」とみなされるか
///
/// null、false、0、空文字列、"0"、空の配列・オブジェクトを空とみなします。
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
