use crate::shared::errors::AppResult;
use rusqlite::Connection;
use std::path::Path;

/// データベース接続を開き、テーブルを作成する
///
/// # 引数
/// * `database_path` - データベースファイルのパス
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
///
/// # 処理内容
/// 1. データベース接続の開設
/// 2. 外部キー制約の有効化
/// 3. テーブル作成とマイグレーションの実行
pub fn initialize_database(database_path: &Path) -> AppResult<Connection> {
    let conn = Connection::open(database_path)?;
    prepare_connection(&conn)?;

    log::info!("データベースを初期化しました: {database_path:?}");

    Ok(conn)
}

/// メモリ上にデータベースを作成する（テスト・一時利用向け）
pub fn open_in_memory() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare_connection(&conn)?;
    Ok(conn)
}

fn prepare_connection(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    create_tables(conn)
}

/// データベーステーブルを作成する
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
pub fn create_tables(conn: &Connection) -> AppResult<()> {
    create_snts_table(conn)?;
    create_metering_devices_table(conn)?;
    create_land_plots_table(conn)?;

    // 料金テーブルは旧スキーマ（単一料金なし）からの移行が必要な場合がある
    let rates_exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='rates'",
        [],
        |row| row.get(0),
    )?;

    if rates_exists == 0 {
        create_rates_table(conn)?;
    } else {
        log::info!("既存のデータベースを確認中...");
        migrate_existing_tables(conn)?;
    }

    create_reading_records_table(conn)?;
    create_indexes(conn)?;

    Ok(())
}

/// 組合（СНТ）テーブルを作成する
fn create_snts_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS snts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            personal_acc TEXT NOT NULL,
            bank_name TEXT NOT NULL,
            bic TEXT NOT NULL,
            corresp_acc TEXT NOT NULL,
            inn TEXT NOT NULL,
            kpp TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// 電力計テーブルを作成する
///
/// 種別と設置時指針の組み合わせはCHECK制約で保証する
fn create_metering_devices_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS metering_devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model TEXT NOT NULL,
            serial_number TEXT NOT NULL,
            model_type TEXT NOT NULL CHECK(model_type IN ('T1', 'T2')),
            acceptance_date TEXT,
            t1 INTEGER,
            t2 INTEGER,
            t_single INTEGER,
            CHECK(
                (model_type = 'T1' AND t_single IS NOT NULL AND t1 IS NULL AND t2 IS NULL)
                OR (model_type = 'T2' AND t1 IS NOT NULL AND t2 IS NOT NULL AND t_single IS NULL)
            )
        )",
        [],
    )?;

    Ok(())
}

/// 区画テーブルを作成する
fn create_land_plots_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS land_plots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plot_number TEXT NOT NULL UNIQUE,
            plot_area INTEGER NOT NULL,
            user_account TEXT,
            snt_id INTEGER REFERENCES snts(id) ON DELETE SET NULL,
            electric_meter_id INTEGER UNIQUE REFERENCES metering_devices(id) ON DELETE SET NULL
        )",
        [],
    )?;

    Ok(())
}

/// 料金テーブルを作成する
fn create_rates_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE rates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            intro_date TEXT NOT NULL,
            t1_rate TEXT NOT NULL,
            t2_rate TEXT NOT NULL,
            t_single_rate TEXT,
            rate_status TEXT CHECK(rate_status IS NULL OR rate_status = 'c'),
            UNIQUE(intro_date, rate_status)
        )",
        [],
    )?;

    Ok(())
}

/// 既存テーブルのマイグレーションを実行する
fn migrate_existing_tables(conn: &Connection) -> AppResult<()> {
    if !check_column_exists(conn, "rates", "t_single_rate") {
        log::info!("t_single_rateカラムを追加します...");
        conn.execute("ALTER TABLE rates ADD COLUMN t_single_rate TEXT", [])?;
    }

    Ok(())
}

/// 指針・支払いレコードテーブルを作成する
fn create_reading_records_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reading_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            land_plot_id INTEGER NOT NULL REFERENCES land_plots(id) ON DELETE CASCADE,
            record_date TEXT NOT NULL,
            counter_number TEXT,
            t1_new INTEGER,
            t2_new INTEGER,
            t_single_new INTEGER,
            t1_prev INTEGER,
            t2_prev INTEGER,
            t_single_prev INTEGER,
            t1_cons INTEGER,
            t2_cons INTEGER,
            t_single_cons INTEGER,
            record_status TEXT NOT NULL DEFAULT 'n'
                CHECK(record_status IN ('n', 'p', 'c', 'i', 's')),
            pay_date TEXT,
            t1_amount TEXT,
            t2_amount TEXT,
            t_single_amount TEXT,
            sum_tot TEXT
        )",
        [],
    )?;

    Ok(())
}

/// インデックスを作成する
///
/// 「区画ごとに新規・支払済みはそれぞれ1件まで」と「現行料金は1件まで」を
/// 部分ユニークインデックスで保証する
fn create_indexes(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reading_records_plot_date
         ON reading_records(land_plot_id, record_date)",
        [],
    )?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_reading_records_single_new
         ON reading_records(land_plot_id) WHERE record_status = 'n'",
        [],
    )?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_reading_records_single_paid
         ON reading_records(land_plot_id) WHERE record_status = 'p'",
        [],
    )?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_rates_single_current
         ON rates(rate_status) WHERE rate_status = 'c'",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_rates_intro_date ON rates(intro_date)",
        [],
    )?;

    Ok(())
}

/// テーブルに指定されたカラムが存在するかチェックする
///
/// # 引数
/// * `conn` - データベース接続
/// * `table_name` - テーブル名
/// * `column_name` - カラム名
///
/// # 戻り値
/// カラムが存在する場合はtrue、存在しないかエラーの場合はfalse
fn check_column_exists(conn: &Connection, table_name: &str, column_name: &str) -> bool {
    let query = format!("PRAGMA table_info({table_name})");

    match conn.prepare(&query) {
        Ok(mut stmt) => match stmt.query_map([], |row| row.get::<_, String>(1)) {
            Ok(rows) => rows.flatten().any(|name| name == column_name),
            Err(_) => false,
        },
        Err(_) => false,
    }
}
