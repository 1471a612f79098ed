use crate::features::readings::{ledger, models::*, repository};
use crate::shared::errors::{AppError, AppResult, ErrorSeverity};
use crate::shared::utils::{parse_date, today_in};
use crate::AppState;
use chrono::NaiveDate;
use chrono_tz::Tz;

/// 重大なエラーのみログに残してメッセージに変換する
///
/// 業務ルール違反は台帳側で警告ログを出力済み
fn to_message(command: &str, error: AppError) -> String {
    if error.severity() == ErrorSeverity::High {
        log::error!("{command} に失敗しました: {}", error.details());
    }
    error.into()
}

/// レコード日付を解析する（省略時は今日、未来日は不可）
fn resolve_record_date(value: Option<&str>, tz: Tz) -> AppResult<NaiveDate> {
    let today = today_in(tz);

    let Some(value) = value.filter(|value| !value.trim().is_empty()) else {
        return Ok(today);
    };

    let date = parse_date(value)?;
    if date > today {
        return Err(AppError::validation("未来の日付は指定できません"));
    }

    Ok(date)
}

/// 指針を提出する
///
/// # 引数
/// * `dto` - 指針提出用DTO
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// 作成された新規レコード、または失敗時はエラーメッセージ
pub fn submit_reading(dto: SubmitReadingDto, state: &AppState) -> Result<ReadingRecord, String> {
    // バリデーション
    let reading = dto.reading()?;
    let record_date = resolve_record_date(dto.record_date.as_deref(), state.settings.timezone)?;

    // データベース接続を取得
    let db = state.lock_db()?;

    ledger::submit_reading(&db, dto.land_plot_id, reading, record_date)
        .map_err(|e| to_message("submit_reading", e))
}

/// 支払い金額を計算する
///
/// # 引数
/// * `record_id` - レコードID
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// 計算結果を反映したレコード、または失敗時はエラーメッセージ
pub fn calculate_payment(record_id: i64, state: &AppState) -> Result<ReadingRecord, String> {
    let db = state.lock_db()?;

    let mut record = repository::find_by_id(&db, record_id)?;
    ledger::calculate_payment(&db, &state.settings, &mut record)
        .map_err(|e| to_message("calculate_payment", e))?;

    Ok(record)
}

/// レコードを支払済みに設定する
///
/// # 引数
/// * `record_id` - レコードID
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// 更新されたレコード、または失敗時はエラーメッセージ
pub fn mark_paid(record_id: i64, state: &AppState) -> Result<ReadingRecord, String> {
    let db = state.lock_db()?;

    let mut record = repository::find_by_id(&db, record_id)?;
    ledger::set_paid(&db, &state.settings, &mut record).map_err(|e| to_message("mark_paid", e))?;

    Ok(record)
}

/// 支払いを確認済みに設定する
///
/// # 引数
/// * `record_id` - レコードID
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// 更新されたレコード、または失敗時はエラーメッセージ
pub fn confirm_payment(record_id: i64, state: &AppState) -> Result<ReadingRecord, String> {
    let db = state.lock_db()?;

    let mut record = repository::find_by_id(&db, record_id)?;
    ledger::set_payment_confirmed(&db, &state.settings, &mut record)
        .map_err(|e| to_message("confirm_payment", e))?;

    Ok(record)
}

/// 新規レコードを初期指針に設定する
pub fn mark_initial(record_id: i64, state: &AppState) -> Result<ReadingRecord, String> {
    let db = state.lock_db()?;

    let mut record = repository::find_by_id(&db, record_id)?;
    ledger::mark_initial(&db, &mut record).map_err(|e| to_message("mark_initial", e))?;

    Ok(record)
}

/// 電力計の設置時指針から初期指針レコードを作成する
///
/// # 引数
/// * `land_plot_id` - 区画ID
/// * `record_date` - レコード日付（YYYY-MM-DD形式、省略時は今日）
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// 作成された初期指針レコード、または失敗時はエラーメッセージ
pub fn create_initial_record(
    land_plot_id: i64,
    record_date: Option<String>,
    state: &AppState,
) -> Result<ReadingRecord, String> {
    let record_date = resolve_record_date(record_date.as_deref(), state.settings.timezone)?;

    let db = state.lock_db()?;

    ledger::create_initial_record(&db, land_plot_id, record_date)
        .map_err(|e| to_message("create_initial_record", e))
}

/// 区画の現在の状態を取得する
pub fn get_plot_state(land_plot_id: i64, state: &AppState) -> Result<PlotState, String> {
    let db = state.lock_db()?;

    ledger::plot_state(&db, land_plot_id).map_err(|e| to_message("get_plot_state", e))
}

/// 区画のレコード一覧を取得する（新しい順）
pub fn get_plot_records(land_plot_id: i64, state: &AppState) -> Result<Vec<ReadingRecord>, String> {
    let db = state.lock_db()?;

    ledger::records_for_plot(&db, land_plot_id).map_err(|e| to_message("get_plot_records", e))
}

/// ユーザーが所有する全区画のレコード一覧を取得する（新しい順）
pub fn get_user_records(user_account: &str, state: &AppState) -> Result<Vec<ReadingRecord>, String> {
    if user_account.trim().is_empty() {
        return Err("ユーザーアカウントを指定してください".to_string());
    }

    let db = state.lock_db()?;

    ledger::records_for_user(&db, user_account.trim())
        .map_err(|e| to_message("get_user_records", e))
}
