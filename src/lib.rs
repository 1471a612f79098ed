// 機能別モジュール構造
pub mod features;
pub mod shared;

use log::{error, info};
use rusqlite::Connection;
use shared::config::{
    initialize_application, initialize_logging_system, load_environment_variables,
    log_initialization_complete, EnvironmentConfig, LedgerSettings,
};
use shared::database::{initialize_database, open_in_memory};
use shared::errors::{AppError, AppResult};
use std::sync::{Mutex, MutexGuard};

pub use features::plots::{Channels, DeviceKind, DeviceReading, LandPlot, MeteringDevice};
pub use features::rates::Rate;
pub use features::readings::{PlotState, ReadingRecord, RecordStatus, Rejection};
pub use shared::errors::ErrorSeverity;

/// アプリケーション状態（データベース接続と台帳の動作設定を保持）
pub struct AppState {
    pub db: Mutex<Connection>,
    pub settings: LedgerSettings,
}

impl AppState {
    /// 既存の接続から状態を作成する
    pub fn new(conn: Connection, settings: LedgerSettings) -> Self {
        Self {
            db: Mutex::new(conn),
            settings,
        }
    }

    /// メモリ上のデータベースで状態を作成する
    pub fn open_in_memory(settings: LedgerSettings) -> AppResult<Self> {
        Ok(Self::new(open_in_memory()?, settings))
    }

    /// データベース接続のロックを取得する
    ///
    /// # 戻り値
    /// ロック済みの接続、またはロックが破損している場合は並行処理エラー
    pub fn lock_db(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロック取得失敗: {e}")))
    }
}

/// アプリケーションを初期化する
///
/// # 戻り値
/// アプリケーション状態、または失敗時はエラー
///
/// # 処理内容
/// 1. 環境変数ファイルの読み込み
/// 2. 環境設定の解析とログシステムの初期化
/// 3. データディレクトリの準備
/// 4. データベースの初期化
pub fn initialize() -> AppResult<AppState> {
    load_environment_variables();

    let env_config = EnvironmentConfig::from_env()?;
    initialize_logging_system(&env_config);

    info!("アプリケーション初期化を開始します...");

    let init_result = initialize_application(&env_config).map_err(|e| {
        error!("アプリケーションの初期化に失敗しました: {e}");
        e
    })?;

    info!("データベースを初期化しています...");
    let db_conn = initialize_database(&init_result.database_path).map_err(|e| {
        error!("データベースの初期化に失敗しました: {e}");
        e
    })?;

    log_initialization_complete(&init_result);

    let settings = env_config.ledger_settings();
    info!(
        "台帳設定: timezone={}, confirmed_history={:?}, rate_resolution={:?}",
        settings.timezone, settings.confirmed_history, settings.rate_resolution
    );

    Ok(AppState::new(db_conn, settings))
}
