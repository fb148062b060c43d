// スキーマドメインモデル
//
// リレーショナルスキーマの定義を表現する型システム。
// モデル定義からの反映結果とデータベースから取得したスキーマの両方をこの型で扱います。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// スキーマ定義
///
/// 複数のテーブル定義を保持します。テーブル名順に並ぶため、生成されるSQLの順序は安定します。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// テーブル定義のマップ（テーブル名 -> Table）
    pub tables: BTreeMap<String, Table>,
}

impl Schema {
    /// 新しいスキーマを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// テーブルを追加
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// 指定されたテーブルが存在するか確認
    pub fn has_table(&self, table_name: &str) -> bool {
        self.tables.contains_key(table_name)
    }

    /// 指定されたテーブルを取得
    pub fn get_table(&self, table_name: &str) -> Option<&Table> {
        self.tables.get(table_name)
    }

    /// テーブル数を取得
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// テーブル定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// テーブル名
    pub name: String,

    /// カラム定義のリスト
    pub columns: Vec<Column>,

    /// プライマリキーのカラム名
    pub primary_key: Vec<String>,

    /// インデックス定義のリスト
    pub indexes: Vec<Index>,
}

impl Table {
    /// 新しいテーブルを作成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// カラムを追加
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// インデックスを追加
    pub fn add_index(&mut self, index: Index) {
        self.indexes.push(index);
    }

    /// プライマリキーを設定
    pub fn set_primary_key(&mut self, columns: Vec<String>) {
        self.primary_key = columns;
    }

    /// 指定されたカラムを取得
    pub fn get_column(&self, column_name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == column_name)
    }

    /// 指定されたインデックスを取得
    pub fn get_index(&self, index_name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == index_name)
    }
}

/// カラム定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// カラム名
    pub name: String,

    /// カラム型
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// NULL許可フラグ
    pub nullable: bool,

    /// 自動増分フラグ
    pub auto_increment: bool,

    /// デフォルト値（SQLリテラル）
    pub default_value: Option<String>,
}

impl Column {
    /// 新しいカラムを作成
    pub fn new(name: impl Into<String>, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable,
            auto_increment: false,
            default_value: None,
        }
    }
}

/// インデックス定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// インデックス名
    pub name: String,

    /// 対象カラム
    pub columns: Vec<String>,

    /// ユニークインデックスかどうか
    pub unique: bool,
}

impl Index {
    /// 新しいインデックスを作成
    pub fn new(name: impl Into<String>, columns: Vec<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            columns,
            unique,
        }
    }
}

/// カラム型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ColumnType {
    /// 整数型
    Integer { unsigned: bool },

    /// 64ビット整数型
    BigInt { unsigned: bool },

    /// 可変長文字列型
    Varchar { length: u32 },

    /// テキスト型（長文）
    Text,

    /// 真偽値型
    Boolean,

    /// 倍精度浮動小数点型
    Double,

    /// 固定小数点数型
    Decimal { precision: u32, scale: u32 },

    /// 日付型
    Date,

    /// 日時型
    DateTime,

    /// JSON型
    Json,
}

impl ColumnType {
    /// 整数系の型かどうか
    pub fn is_integer(&self) -> bool {
        matches!(self, ColumnType::Integer { .. } | ColumnType::BigInt { .. })
    }
}
