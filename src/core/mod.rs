// Core Domain
// モデル定義、汎用クエリ、スキーマ、イベント、アクセス制御の純粋なドメイン型

pub mod config;
pub mod error;
pub mod event;
pub mod field;
pub mod migration;
pub mod model;
pub mod naming;
pub mod permission;
pub mod query;
pub mod schema;
pub mod schema_diff;
