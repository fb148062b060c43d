// Adapters
// データベースへのアクセスとSQLの組み立てを抽象化

pub mod connection_string;
pub mod database;
pub mod database_introspector;
pub mod query_builder;
pub mod row_codec;
pub mod sql_generator;
pub mod sql_quote;
pub mod storage;
pub mod type_mapping;
