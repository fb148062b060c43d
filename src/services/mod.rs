// Services Layer
// ドメインロジックを実行するサービス層

pub mod api;
pub mod config_loader;
pub mod event_dispatcher;
pub mod migration_generator;
pub mod model_factory;
pub mod model_loader;
pub mod model_registry;
pub mod model_validator;
pub mod permissions;
pub mod schema_diff_detector;
pub mod schema_migrator;
pub mod schema_reflector;
pub mod storage_factory;
