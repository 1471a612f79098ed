use super::environment::{get_database_filename, get_environment, Environment, EnvironmentConfig};
use crate::shared::errors::AppResult;
use std::fs;
use std::path::{Path, PathBuf};

/// アプリケーション初期化の結果を表す構造体
#[derive(Debug)]
pub struct InitializationResult {
    /// 初回起動かどうか
    pub is_first_run: bool,
    /// アプリケーションデータディレクトリのパス
    pub app_data_dir: PathBuf,
    /// データベースファイルのパス
    pub database_path: PathBuf,
    /// 実行環境
    pub environment: Environment,
}

/// アプリケーションの初期化を実行する
///
/// # 引数
/// * `env_config` - 環境設定
///
/// # 戻り値
/// 初期化結果、または失敗時はエラー
///
/// # 処理内容
/// 1. アプリケーションデータディレクトリの作成
/// 2. 初回起動の判定
/// 3. 環境に応じたデータベースファイルパスの決定
pub fn initialize_application(env_config: &EnvironmentConfig) -> AppResult<InitializationResult> {
    let environment = get_environment();

    let app_data_dir = ensure_app_data_directory(&env_config.resolve_data_dir()?)?;

    let db_filename = get_database_filename(environment.clone());
    let database_path = app_data_dir.join(db_filename);

    // 初回起動かどうかを判定（データベースファイルの存在で判定）
    let is_first_run = !database_path.exists();

    if is_first_run {
        log_first_run_initialization(&environment, &app_data_dir, &database_path);
    }

    Ok(InitializationResult {
        is_first_run,
        app_data_dir,
        database_path,
        environment,
    })
}

/// アプリケーションデータディレクトリを確実に作成する
fn ensure_app_data_directory(app_data_dir: &Path) -> AppResult<PathBuf> {
    if !app_data_dir.exists() {
        fs::create_dir_all(app_data_dir)?;
        log::info!("アプリケーションデータディレクトリを作成しました: {app_data_dir:?}");
    }

    Ok(app_data_dir.to_path_buf())
}

/// 初回起動時の初期化ログを出力する
fn log_first_run_initialization(
    environment: &Environment,
    app_data_dir: &Path,
    database_path: &Path,
) {
    log::info!("=== アプリケーション初回起動 ===");
    log::info!("実行環境: {environment:?}");
    log::info!("アプリデータディレクトリ: {app_data_dir:?}");
    log::info!("データベースファイル: {database_path:?}");
}

/// 初期化完了ログを出力する
///
/// # 引数
/// * `result` - 初期化結果
pub fn log_initialization_complete(result: &InitializationResult) {
    if result.is_first_run {
        log::info!("初回起動の初期化が正常に完了しました");
    } else {
        log::info!("アプリケーション起動完了（既存データベースを使用）");
    }
    log::info!("環境: {:?}", result.environment);
    log::info!("データベース: {:?}", result.database_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with_data_dir(dir: &Path) -> EnvironmentConfig {
        let dir = dir.to_string_lossy().to_string();
        EnvironmentConfig::from_lookup(Environment::Development, move |key| {
            (key == "SNT_DATA_DIR").then(|| dir.clone())
        })
        .unwrap()
    }

    #[test]
    fn test_initialize_application_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("nested").join("snt");
        let config = config_with_data_dir(&data_dir);

        let result = initialize_application(&config).unwrap();

        assert!(data_dir.exists());
        assert!(result.is_first_run);
        assert_eq!(result.app_data_dir, data_dir);
        assert!(result.database_path.starts_with(&data_dir));
        assert!(result
            .database_path
            .to_string_lossy()
            .ends_with("snt_billing.db"));
    }

    #[test]
    fn test_existing_database_is_not_first_run() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_with_data_dir(temp_dir.path());

        let first = initialize_application(&config).unwrap();
        fs::write(&first.database_path, b"").unwrap();

        let second = initialize_application(&config).unwrap();
        assert!(!second.is_first_run);
        log_initialization_complete(&second);
    }
}
