use super::models::Rate;
use super::repository;
use crate::shared::config::RateResolution;
use crate::shared::errors::AppResult;
use chrono::NaiveDate;
use rusqlite::Connection;

/// 適用する料金を解決する
///
/// # 引数
/// * `conn` - データベース接続
/// * `resolution` - 解決方法（現行フラグ / 基準日）
/// * `reference_date` - 基準日（確認済みレコードは支払日、それ以外はレコード日付）
///
/// # 戻り値
/// 料金、または該当がない場合はNone（支払い計算はこの場合に中断する）
pub fn resolve(
    conn: &Connection,
    resolution: RateResolution,
    reference_date: NaiveDate,
) -> AppResult<Option<Rate>> {
    let rate = match resolution {
        RateResolution::CurrentFlag => repository::find_current(conn)?,
        RateResolution::ByDate => repository::find_latest_effective(conn, reference_date)?,
    };

    match &rate {
        Some(rate) => log::debug!(
            "料金を解決しました: id={}, intro_date={}, resolution={resolution:?}",
            rate.id,
            rate.intro_date
        ),
        None => log::debug!(
            "適用できる料金がありません: resolution={resolution:?}, reference_date={reference_date}"
        ),
    }

    Ok(rate)
}
