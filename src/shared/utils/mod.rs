use crate::shared::errors::{AppError, AppResult};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// データベースに保存する日付の書式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 指定タイムゾーンでの今日の日付を取得する
///
/// # 引数
/// * `tz` - 組合のタイムゾーン
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// YYYY-MM-DD 形式の文字列を日付に変換する
///
/// # 引数
/// * `value` - 日付文字列
///
/// # 戻り値
/// 日付、または形式が不正な場合はバリデーションエラー
pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        AppError::validation("日付の形式が正しくありません（YYYY-MM-DD形式で入力してください）")
    })
}

/// 日付をデータベース保存用の文字列に変換する
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 金額を小数2桁に丸める（0.5は0から遠い方へ）
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// rusqliteの行から日付列を読み取る
pub fn date_from_sql(value: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// rusqliteの行から金額列（TEXT）を読み取る
pub fn decimal_from_sql(value: String) -> rusqlite::Result<Decimal> {
    Decimal::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// NULL許容の金額列を読み取る
pub fn optional_decimal_from_sql(value: Option<String>) -> rusqlite::Result<Option<Decimal>> {
    value.map(decimal_from_sql).transpose()
}

/// NULL許容の日付列を読み取る
pub fn optional_date_from_sql(value: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    value.map(date_from_sql).transpose()
}
