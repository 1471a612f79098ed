/// 環境設定関連のモジュール
pub mod environment;
pub mod initialization;
pub mod settings;

// 便利な再エクスポート
pub use environment::{
    get_database_filename, get_environment, initialize_logging_system,
    load_environment_variables, Environment, EnvironmentConfig,
};
pub use initialization::{initialize_application, log_initialization_complete, InitializationResult};
pub use settings::{ConfirmedHistoryPolicy, LedgerSettings, RateResolution, DEFAULT_TIMEZONE};
