// エラー型定義
//
// フレームワーク全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、アクセス拒否・プラグイン未登録・クエリ・データベース・
// モデル定義検証のエラーを定義し、FluxErrorに集約します。

use thiserror::Error;

/// アクセス拒否エラー
///
/// パーミッションチェックで拒否された場合に発生します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Access denied: {message}")]
pub struct AccessDeniedError {
    /// エラーメッセージ
    pub message: String,
}

impl AccessDeniedError {
    /// 新しいアクセス拒否エラーを作成
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// プラグインエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// 指定されたプラグインが登録されていない
    #[error("{kind} plugin \"{name}\" is not registered")]
    NotRegistered {
        /// プラグインの種類（Model, Storage など）
        kind: String,
        /// プラグイン名
        name: String,
    },

    /// 同名のプラグインが既に登録されている
    #[error("{kind} plugin \"{name}\" is already registered")]
    AlreadyRegistered { kind: String, name: String },
}

impl PluginError {
    /// 未登録のModelプラグイン
    pub fn model_not_registered(name: &str) -> Self {
        PluginError::NotRegistered {
            kind: "Model".to_string(),
            name: name.to_string(),
        }
    }

    /// 未登録のStorageプラグイン
    pub fn storage_not_registered(name: &str) -> Self {
        PluginError::NotRegistered {
            kind: "Storage".to_string(),
            name: name.to_string(),
        }
    }
}

/// クエリエラー
///
/// 汎用クエリをバックエンド固有の操作に変換する際のエラーです。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// 未登録のフィルター
    #[error("Unknown filter \"{name}\"")]
    UnknownFilter { name: String },

    /// フィルターの引数が不正
    #[error("Invalid parameters for filter \"{filter}\": {message}")]
    InvalidParams { filter: String, message: String },

    /// 不正な識別子
    #[error("Invalid identifier '{identifier}'")]
    InvalidIdentifier { identifier: String },

    /// クエリ種別に対して必要な情報が不足
    #[error("Incomplete query: {message}")]
    Incomplete { message: String },
}

impl QueryError {
    /// 引数不正エラーを作成
    pub fn invalid_params(filter: &str, message: impl Into<String>) -> Self {
        QueryError::InvalidParams {
            filter: filter.to_string(),
            message: message.into(),
        }
    }
}

/// データベースエラー
///
/// データベース操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}")]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// Introspection error
    #[error("Schema introspection error: {message}")]
    Introspection { message: String },

    /// Unsupported operation for the dialect
    #[error("Unsupported operation for {dialect}: {message}")]
    Unsupported { dialect: String, message: String },
}

impl DatabaseError {
    /// SQL付きのクエリ実行エラーを作成
    pub fn query(message: impl Into<String>, sql: &str) -> Self {
        DatabaseError::Query {
            message: message.into(),
            sql: Some(sql.to_string()),
        }
    }

    /// 失敗したSQLを取得
    pub fn sql(&self) -> Option<&str> {
        match self {
            DatabaseError::Query { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }
}

/// ストレージエラー
///
/// Storageプラグインの操作中に発生するエラーです。
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// モデルデータの変換エラー
    #[error("Invalid model data for {model}: {message}")]
    InvalidData { model: String, message: String },

    /// ストレージがサポートしない操作
    #[error("Storage \"{storage}\" does not support {operation}")]
    Unsupported { storage: String, operation: String },
}

/// モデル定義の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Reference error
    #[error("Reference error: {message}{}", format_location_opt(.location))]
    Reference {
        /// エラーメッセージ
        message: String,
        /// エラー発生位置
        location: Option<ErrorLocation>,
        /// 修正提案
        suggestion: Option<String>,
    },

    /// Constraint error
    #[error("Constraint error: {message}{}", format_location_opt(.location))]
    Constraint {
        /// エラーメッセージ
        message: String,
        /// エラー発生位置
        location: Option<ErrorLocation>,
        /// 修正提案
        suggestion: Option<String>,
    },

    /// Naming error
    #[error("Naming error: {message}{}", format_location_opt(.location))]
    Naming {
        message: String,
        location: Option<ErrorLocation>,
    },
}

impl ValidationError {
    /// 参照エラーかどうか
    pub fn is_reference(&self) -> bool {
        matches!(self, ValidationError::Reference { .. })
    }

    /// 制約エラーかどうか
    pub fn is_constraint(&self) -> bool {
        matches!(self, ValidationError::Constraint { .. })
    }

    /// 命名エラーかどうか
    pub fn is_naming(&self) -> bool {
        matches!(self, ValidationError::Naming { .. })
    }

    /// エラー発生位置を取得
    pub fn location(&self) -> Option<&ErrorLocation> {
        match self {
            ValidationError::Reference { location, .. }
            | ValidationError::Constraint { location, .. }
            | ValidationError::Naming { location, .. } => location.as_ref(),
        }
    }

    /// 修正提案を取得
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ValidationError::Reference { suggestion, .. }
            | ValidationError::Constraint { suggestion, .. } => suggestion.as_deref(),
            ValidationError::Naming { .. } => None,
        }
    }
}

/// エラー発生位置
///
/// モデル定義内のエラー発生位置を表現します。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorLocation {
    /// モデル名
    pub model: Option<String>,
    /// フィールド名
    pub field: Option<String>,
}

impl ErrorLocation {
    /// モデル名を指定してエラー位置を作成
    pub fn with_model(model: &str) -> Self {
        Self {
            model: Some(model.to_string()),
            field: None,
        }
    }

    /// モデル名とフィールド名を指定してエラー位置を作成
    pub fn with_field(model: &str, field: &str) -> Self {
        Self {
            model: Some(model.to_string()),
            field: Some(field.to_string()),
        }
    }

    /// 位置情報をフォーマット
    pub fn format(&self) -> String {
        let mut parts = Vec::new();

        if let Some(model) = &self.model {
            parts.push(format!("model: {}", model));
        }
        if let Some(field) = &self.field {
            parts.push(format!("field: {}", field));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!(" ({})", parts.join(", "))
        }
    }
}

fn format_location_opt(location: &Option<ErrorLocation>) -> String {
    location.as_ref().map_or(String::new(), |loc| loc.format())
}

/// バリデーション結果
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// エラーのリスト
    pub errors: Vec<ValidationError>,
    /// 警告メッセージのリスト
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// 新しいバリデーション結果を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// エラーを追加
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// 警告を追加
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// 検証が成功したかどうか（エラーがない場合は成功）
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// エラーの数を取得
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// 他のバリデーション結果をマージ
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// フレームワーク全体のエラー
#[derive(Debug, Error)]
pub enum FluxError {
    #[error(transparent)]
    AccessDenied(#[from] AccessDeniedError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl FluxError {
    /// アクセス拒否エラーかどうか
    pub fn is_access_denied(&self) -> bool {
        matches!(self, FluxError::AccessDenied(_))
    }

    /// 未登録プラグインエラーかどうか
    pub fn is_not_registered(&self) -> bool {
        matches!(
            self,
            FluxError::Plugin(PluginError::NotRegistered { .. })
                | FluxError::Storage(StorageError::Plugin(PluginError::NotRegistered { .. }))
        )
    }
}

impl From<DatabaseError> for FluxError {
    fn from(error: DatabaseError) -> Self {
        FluxError::Storage(StorageError::Database(error))
    }
}
