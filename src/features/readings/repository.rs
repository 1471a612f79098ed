use super::models::ReadingRecord;
use super::rejection::Rejection;
use super::status::RecordStatus;
use crate::features::plots::{Channels, DeviceReading};
use crate::shared::database::is_unique_violation;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{
    date_from_sql, format_date, optional_date_from_sql, optional_decimal_from_sql,
};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const RECORD_COLUMNS: &str = "id, land_plot_id, record_date, counter_number,
     t1_new, t2_new, t_single_new, t1_prev, t2_prev, t_single_prev,
     t1_cons, t2_cons, t_single_cons, record_status, pay_date,
     t1_amount, t2_amount, t_single_amount, sum_tot";

/// 最新順の並び（同日の場合は後から登録したものを新しいとみなす）
const NEWEST_FIRST: &str = "ORDER BY record_date DESC, id DESC";

fn invalid_column(index: usize, name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(index, name.to_string(), Type::Null)
}

/// 3列（t1, t2, t_single）の組をチャネル値として読み取る
///
/// 3列すべてNULLの場合はNone、組み合わせが不正な場合はエラー
fn channels_from_row<T: rusqlite::types::FromSql>(
    row: &Row,
    first: usize,
    name: &str,
) -> rusqlite::Result<Option<Channels<T>>> {
    let t1: Option<T> = row.get(first)?;
    let t2: Option<T> = row.get(first + 1)?;
    let single: Option<T> = row.get(first + 2)?;

    if t1.is_none() && t2.is_none() && single.is_none() {
        return Ok(None);
    }

    Channels::from_columns(t1, t2, single)
        .map(Some)
        .ok_or_else(|| invalid_column(first, name))
}

fn amounts_from_row(row: &Row) -> rusqlite::Result<Option<Channels<rust_decimal::Decimal>>> {
    let t1 = optional_decimal_from_sql(row.get(15)?)?;
    let t2 = optional_decimal_from_sql(row.get(16)?)?;
    let single = optional_decimal_from_sql(row.get(17)?)?;

    if t1.is_none() && t2.is_none() && single.is_none() {
        return Ok(None);
    }

    Channels::from_columns(t1, t2, single)
        .map(Some)
        .ok_or_else(|| invalid_column(15, "t1_amount"))
}

fn record_from_row(row: &Row) -> rusqlite::Result<ReadingRecord> {
    let status_code: String = row.get(13)?;
    let status = RecordStatus::from_code(&status_code)
        .ok_or_else(|| invalid_column(13, "record_status"))?;

    Ok(ReadingRecord {
        id: row.get(0)?,
        land_plot_id: row.get(1)?,
        record_date: date_from_sql(row.get(2)?)?,
        counter_number: row.get(3)?,
        new_reading: channels_from_row(row, 4, "t1_new")?
            .ok_or_else(|| invalid_column(4, "t1_new"))?,
        previous_reading: channels_from_row(row, 7, "t1_prev")?,
        consumption: channels_from_row(row, 10, "t1_cons")?,
        status,
        pay_date: optional_date_from_sql(row.get(14)?)?,
        amounts: amounts_from_row(row)?,
        total_amount: optional_decimal_from_sql(row.get(18)?)?,
    })
}

/// 一意インデックス違反を「未確定レコードが既に存在する」違反に変換する
fn map_write_error(error: rusqlite::Error, status: RecordStatus) -> AppError {
    if is_unique_violation(&error) {
        log::warn!("一意インデックスにより重複レコードを拒否しました: status={status}");
        return Rejection::OpenRecordExists(status).into();
    }

    log::error!("レコードの書き込みに失敗しました: {error}");
    error.into()
}

/// 新規レコードを登録する
///
/// # 引数
/// * `conn` - データベース接続
/// * `land_plot_id` - 区画ID
/// * `record_date` - レコード日付
/// * `counter_number` - 電力計の製造番号
/// * `new_reading` - 今回の指針
///
/// # 戻り値
/// 登録されたレコード、または失敗時はエラー
pub fn insert_new(
    conn: &Connection,
    land_plot_id: i64,
    record_date: NaiveDate,
    counter_number: Option<&str>,
    new_reading: DeviceReading,
) -> AppResult<ReadingRecord> {
    let (t1_new, t2_new, t_single_new) = new_reading.into_columns();

    conn.execute(
        "INSERT INTO reading_records
            (land_plot_id, record_date, counter_number, t1_new, t2_new, t_single_new, record_status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'n')",
        params![
            land_plot_id,
            format_date(record_date),
            counter_number,
            t1_new,
            t2_new,
            t_single_new
        ],
    )
    .map_err(|e| map_write_error(e, RecordStatus::New))?;

    find_by_id(conn, conn.last_insert_rowid())
}

/// レコードの計算結果・ステータスを保存する
///
/// # 引数
/// * `conn` - データベース接続
/// * `record` - 保存するレコード
///
/// # 戻り値
/// 成功時はOk(())、レコードが存在しない場合はNotFoundエラー
pub fn save(conn: &Connection, record: &ReadingRecord) -> AppResult<()> {
    let (t1_new, t2_new, t_single_new) = record.new_reading.into_columns();
    let (t1_prev, t2_prev, t_single_prev) = split(record.previous_reading);
    let (t1_cons, t2_cons, t_single_cons) = split(record.consumption);
    let (t1_amount, t2_amount, t_single_amount) =
        split(record.amounts.map(|amounts| amounts.map(|amount| amount.to_string())));

    let rows_affected = conn
        .execute(
            "UPDATE reading_records SET
                record_date = ?1, counter_number = ?2,
                t1_new = ?3, t2_new = ?4, t_single_new = ?5,
                t1_prev = ?6, t2_prev = ?7, t_single_prev = ?8,
                t1_cons = ?9, t2_cons = ?10, t_single_cons = ?11,
                record_status = ?12, pay_date = ?13,
                t1_amount = ?14, t2_amount = ?15, t_single_amount = ?16, sum_tot = ?17
             WHERE id = ?18",
            params![
                format_date(record.record_date),
                record.counter_number,
                t1_new,
                t2_new,
                t_single_new,
                t1_prev,
                t2_prev,
                t_single_prev,
                t1_cons,
                t2_cons,
                t_single_cons,
                record.status.as_code(),
                record.pay_date.map(format_date),
                t1_amount,
                t2_amount,
                t_single_amount,
                record.total_amount.map(|total| total.to_string()),
                record.id
            ],
        )
        .map_err(|e| map_write_error(e, record.status))?;

    if rows_affected == 0 {
        return Err(AppError::not_found(format!("ID {} のレコード", record.id)));
    }

    Ok(())
}

fn split<T>(channels: Option<Channels<T>>) -> (Option<T>, Option<T>, Option<T>) {
    channels
        .map(Channels::into_columns)
        .unwrap_or((None, None, None))
}

/// IDでレコードを取得する
pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<ReadingRecord> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM reading_records WHERE id = ?1"),
        params![id],
        record_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::not_found(format!("ID {id} のレコード")),
        _ => AppError::from(e),
    })
}

/// 区画の指定ステータスで最新のレコードを取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `land_plot_id` - 区画ID
/// * `status` - ステータス
///
/// # 戻り値
/// レコード、または該当がない場合はNone
pub fn find_latest_by_status(
    conn: &Connection,
    land_plot_id: i64,
    status: RecordStatus,
) -> AppResult<Option<ReadingRecord>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM reading_records
                 WHERE land_plot_id = ?1 AND record_status = ?2
                 {NEWEST_FIRST} LIMIT 1"
            ),
            params![land_plot_id, status.as_code()],
            record_from_row,
        )
        .optional()?;

    Ok(record)
}

/// 区画の指定ステータスのレコード数を数える
///
/// # 引数
/// * `conn` - データベース接続
/// * `land_plot_id` - 区画ID
/// * `status` - ステータス
/// * `exclude_id` - 数から除外するレコードID（判定対象のレコード自身）
pub fn count_by_status(
    conn: &Connection,
    land_plot_id: i64,
    status: RecordStatus,
    exclude_id: Option<i64>,
) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM reading_records
         WHERE land_plot_id = ?1 AND record_status = ?2 AND id IS NOT ?3",
        params![land_plot_id, status.as_code(), exclude_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// 区画のレコード数を数える（ステータスを問わない）
pub fn count_for_plot(
    conn: &Connection,
    land_plot_id: i64,
    exclude_id: Option<i64>,
) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM reading_records WHERE land_plot_id = ?1 AND id IS NOT ?2",
        params![land_plot_id, exclude_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// 区画のレコード一覧を新しい順に取得する
pub fn find_by_plot(conn: &Connection, land_plot_id: i64) -> AppResult<Vec<ReadingRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM reading_records WHERE land_plot_id = ?1 {NEWEST_FIRST}"
    ))?;

    let records = stmt.query_map(params![land_plot_id], record_from_row)?;

    records.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
}

/// ユーザーが所有する全区画のレコード一覧を新しい順に取得する
pub fn find_by_user(conn: &Connection, user_account: &str) -> AppResult<Vec<ReadingRecord>> {
    let columns = RECORD_COLUMNS
        .split(',')
        .map(|column| format!("r.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut stmt = conn.prepare(&format!(
        "SELECT {columns} FROM reading_records r
         JOIN land_plots p ON p.id = r.land_plot_id
         WHERE p.user_account = ?1
         ORDER BY r.record_date DESC, r.id DESC"
    ))?;

    let records = stmt.query_map(params![user_account], record_from_row)?;

    records.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
}

/// 区画の確認済みレコードのステータスを一括で変更する
///
/// # 引数
/// * `conn` - データベース接続
/// * `land_plot_id` - 区画ID
/// * `keep_id` - 変更しないレコードID
/// * `status` - 変更後のステータス
///
/// # 戻り値
/// 変更した行数
pub fn supersede_confirmed(
    conn: &Connection,
    land_plot_id: i64,
    keep_id: i64,
    status: RecordStatus,
) -> AppResult<usize> {
    let rows_affected = conn.execute(
        "UPDATE reading_records SET record_status = ?1
         WHERE land_plot_id = ?2 AND record_status = ?3 AND id != ?4",
        params![
            status.as_code(),
            land_plot_id,
            RecordStatus::Confirmed.as_code(),
            keep_id
        ],
    )?;

    Ok(rows_affected)
}
