// FluxAPIライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: コアドメイン（モデル定義、汎用クエリ、スキーマ、イベント、アクセス制御）
// - adapters: データベースへのアクセスとSQLの組み立てを抽象化
// - services: モデルのCRUD、パーミッション、イベント配送、スキーママイグレーション

pub mod adapters;
pub mod cli;
pub mod core;
pub mod services;
