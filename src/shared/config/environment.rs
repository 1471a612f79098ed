use super::settings::{
    parse_timezone, ConfirmedHistoryPolicy, LedgerSettings, RateResolution, DEFAULT_TIMEZONE,
};
use crate::shared::errors::{AppError, AppResult};
use chrono_tz::Tz;
use std::path::PathBuf;

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: String,
    /// デバッグモードの有効/無効
    pub debug_mode: bool,
    /// ログレベル
    pub log_level: String,
    /// データディレクトリ（未指定時は OS 標準のデータディレクトリ）
    pub data_dir: Option<PathBuf>,
    /// 組合のタイムゾーン
    pub timezone: Tz,
    /// 確認済みレコードの履歴ポリシー
    pub confirmed_history: ConfirmedHistoryPolicy,
    /// 料金の解決方法
    pub rate_resolution: RateResolution,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    /// 環境設定、または値が不正な場合は設定エラー
    ///
    /// # 読み込み順序
    /// 1. コンパイル時埋め込み値（EMBEDDED_*）
    /// 2. 実行時環境変数
    /// 3. 既定値
    pub fn from_env() -> AppResult<Self> {
        let environment = get_environment();
        Self::from_lookup(environment, |key| match key {
            "SNT_TIMEZONE" => option_env!("EMBEDDED_SNT_TIMEZONE").map(str::to_string),
            "SNT_CONFIRMED_HISTORY" => {
                option_env!("EMBEDDED_SNT_CONFIRMED_HISTORY").map(str::to_string)
            }
            "SNT_RATE_RESOLUTION" => {
                option_env!("EMBEDDED_SNT_RATE_RESOLUTION").map(str::to_string)
            }
            _ => None,
        }
        .or_else(|| std::env::var(key).ok()))
    }

    /// 任意の参照関数から設定を組み立てる
    ///
    /// # 引数
    /// * `environment` - 実行環境
    /// * `lookup` - 変数名から値を返す関数
    pub fn from_lookup<F>(environment: Environment, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug_mode = environment == Environment::Development;
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| {
            if debug_mode {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        let timezone = match lookup("SNT_TIMEZONE") {
            Some(name) => parse_timezone(&name)?,
            None => DEFAULT_TIMEZONE,
        };

        let confirmed_history = match lookup("SNT_CONFIRMED_HISTORY") {
            Some(value) => value.parse()?,
            None => ConfirmedHistoryPolicy::default(),
        };

        let rate_resolution = match lookup("SNT_RATE_RESOLUTION") {
            Some(value) => value.parse()?,
            None => RateResolution::default(),
        };

        Ok(Self {
            environment: format!("{environment:?}").to_lowercase(),
            debug_mode,
            log_level,
            data_dir: lookup("SNT_DATA_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            timezone,
            confirmed_history,
            rate_resolution,
        })
    }

    /// プロダクション環境かどうかを判定
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 開発環境かどうかを判定
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// 台帳操作用の設定を取り出す
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            timezone: self.timezone,
            confirmed_history: self.confirmed_history,
            rate_resolution: self.rate_resolution,
        }
    }

    /// データディレクトリを決定する
    ///
    /// # 戻り値
    /// SNT_DATA_DIR が指定されていればそのパス、なければ OS 標準のデータディレクトリ配下
    pub fn resolve_data_dir(&self) -> AppResult<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }

        dirs::data_dir()
            .map(|dir| dir.join("snt-billing"))
            .ok_or_else(|| AppError::configuration("データディレクトリを特定できません"))
    }
}

/// 現在の実行環境を判定する
///
/// # 戻り値
/// 現在の実行環境（Development または Production）
///
/// # 判定ロジック
/// 1. コンパイル時埋め込み環境変数を最優先
/// 2. 実行時環境変数 ENVIRONMENT を確認
/// 3. デバッグビルドの場合は Development
/// 4. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    // コンパイル時埋め込み環境変数を最優先
    if let Some(embedded_env) = option_env!("EMBEDDED_ENVIRONMENT") {
        let env = parse_environment(embedded_env);
        log::debug!("環境判定: コンパイル時埋め込み値を使用 -> {embedded_env} -> {env:?}");
        return env;
    }

    // 実行時環境変数を確認
    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        let env = parse_environment(&env_var);
        log::debug!("環境判定: 実行時環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    // フォールバック: ビルド設定に基づく判定
    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

fn parse_environment(value: &str) -> Environment {
    match value {
        "production" => Environment::Production,
        _ => Environment::Development,
    }
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_snt_billing.db"
/// - プロダクション環境: "snt_billing.db"
pub fn get_database_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_snt_billing.db",
        Environment::Production => "snt_billing.db",
    }
}

/// 環境に応じた.envファイルを読み込む
///
/// # 処理内容
/// 1. コンパイル時埋め込み環境変数をチェック
/// 2. 環境に応じた.envファイルを読み込み
/// 3. フォールバック処理
pub fn load_environment_variables() {
    if let Some(env) = option_env!("EMBEDDED_ENVIRONMENT") {
        log::info!("コンパイル時埋め込み環境設定を使用: {env}");
        return;
    }

    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    log::info!("環境: {environment}, 読み込み対象: {env_file}");

    match dotenv::from_filename(env_file) {
        Ok(_) => {
            log::info!("{env_file}ファイルを読み込みました");
        }
        Err(_) => {
            // 環境固有のファイルがない場合は、デフォルトの.envを試行
            if env_file != ".env" && dotenv::dotenv().is_ok() {
                log::warn!("{env_file}が見つからないため、デフォルトの.envファイルを読み込みました");
            } else {
                log::warn!("環境変数ファイルが見つかりません。直接設定された環境変数を使用します。");
            }
        }
    }
}

/// ログシステムを初期化する
///
/// # 引数
/// * `env_config` - 環境設定
///
/// # 処理内容
/// 1. ログレベルを設定
/// 2. env_loggerを初期化（二重初期化は無視する）
pub fn initialize_logging_system(env_config: &EnvironmentConfig) {
    let log_level = match env_config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    let initialized = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .is_ok();

    if initialized {
        log::info!(
            "ログシステムを初期化しました: level={}, environment={}",
            env_config.log_level,
            env_config.environment
        );
    }
}
