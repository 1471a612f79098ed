use super::models::{validate_rate, IntroduceRateDto, Rate};
use crate::shared::database::with_immediate_transaction;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{
    date_from_sql, decimal_from_sql, format_date, optional_decimal_from_sql, parse_date,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const RATE_COLUMNS: &str = "id, intro_date, t1_rate, t2_rate, t_single_rate, rate_status";

fn rate_from_row(row: &Row) -> rusqlite::Result<Rate> {
    let rate_status: Option<String> = row.get(5)?;

    Ok(Rate {
        id: row.get(0)?,
        intro_date: date_from_sql(row.get(1)?)?,
        t1_rate: decimal_from_sql(row.get(2)?)?,
        t2_rate: decimal_from_sql(row.get(3)?)?,
        t_single_rate: optional_decimal_from_sql(row.get(4)?)?,
        is_current: rate_status.as_deref() == Some("c"),
    })
}

/// 新しい料金を導入する
///
/// 以前の現行料金の「現行」フラグを外し、新しい料金を現行として登録する。
/// 2つの更新は同じトランザクション内で行う。
///
/// # 引数
/// * `conn` - データベース接続
/// * `dto` - 料金導入用DTO
/// * `today` - 導入日省略時に使う今日の日付
///
/// # 戻り値
/// 登録された料金、または失敗時はエラー
pub fn introduce(conn: &Connection, dto: IntroduceRateDto, today: NaiveDate) -> AppResult<Rate> {
    let intro_date = match dto.intro_date.as_deref() {
        Some(value) => parse_date(value)?,
        None => today,
    };
    let t1_rate = validate_rate("昼料金", dto.t1_rate)?;
    let t2_rate = validate_rate("夜料金", dto.t2_rate)?;
    let t_single_rate = dto
        .t_single_rate
        .map(|rate| validate_rate("単一料金", rate))
        .transpose()?;

    with_immediate_transaction(conn, |tx| {
        let cleared = clear_current(tx)?;
        if cleared > 0 {
            log::debug!("以前の現行料金のフラグを解除しました");
        }

        tx.execute(
            "INSERT INTO rates (intro_date, t1_rate, t2_rate, t_single_rate, rate_status)
             VALUES (?1, ?2, ?3, ?4, 'c')",
            params![
                format_date(intro_date),
                t1_rate.to_string(),
                t2_rate.to_string(),
                t_single_rate.map(|rate| rate.to_string())
            ],
        )?;

        let rate = find_by_id(tx, tx.last_insert_rowid())?;
        log::info!(
            "料金を導入しました: intro_date={}, t1={}, t2={}, single={:?}",
            rate.intro_date,
            rate.t1_rate,
            rate.t2_rate,
            rate.t_single_rate
        );

        Ok(rate)
    })
}

/// 現行料金のフラグを解除する
///
/// # 戻り値
/// フラグを解除した行数
pub fn clear_current(conn: &Connection) -> AppResult<usize> {
    let rows_affected = conn.execute(
        "UPDATE rates SET rate_status = NULL WHERE rate_status = 'c'",
        [],
    )?;

    Ok(rows_affected)
}

/// 現行フラグの付いた料金を取得する
pub fn find_current(conn: &Connection) -> AppResult<Option<Rate>> {
    let rate = conn
        .query_row(
            &format!("SELECT {RATE_COLUMNS} FROM rates WHERE rate_status = 'c'"),
            [],
            rate_from_row,
        )
        .optional()?;

    Ok(rate)
}

/// 基準日以前に導入された最新の料金を取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `reference_date` - 基準日
///
/// # 戻り値
/// 料金、または該当がない場合はNone
pub fn find_latest_effective(
    conn: &Connection,
    reference_date: NaiveDate,
) -> AppResult<Option<Rate>> {
    let rate = conn
        .query_row(
            &format!(
                "SELECT {RATE_COLUMNS} FROM rates
                 WHERE intro_date <= ?1
                 ORDER BY intro_date DESC, id DESC
                 LIMIT 1"
            ),
            params![format_date(reference_date)],
            rate_from_row,
        )
        .optional()?;

    Ok(rate)
}

/// IDで料金を取得する
pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Rate> {
    conn.query_row(
        &format!("SELECT {RATE_COLUMNS} FROM rates WHERE id = ?1"),
        params![id],
        rate_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::not_found(format!("ID {id} の料金")),
        _ => AppError::from(e),
    })
}

/// 料金の一覧を導入日の新しい順に取得する
pub fn find_all(conn: &Connection) -> AppResult<Vec<Rate>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RATE_COLUMNS} FROM rates ORDER BY intro_date DESC, id DESC"
    ))?;

    let rates = stmt.query_map([], rate_from_row)?;

    rates.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
}
