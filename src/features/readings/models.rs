use super::status::RecordStatus;
use crate::features::plots::{ChannelAmounts, Channels, Consumption, DeviceKind, DeviceReading};
use crate::shared::errors::{AppError, AppResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 指針・支払いレコードデータモデル
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReadingRecord {
    pub id: i64,
    pub land_plot_id: i64,
    pub record_date: NaiveDate,
    /// 提出時の電力計の製造番号
    pub counter_number: Option<String>,
    /// 今回の指針
    pub new_reading: DeviceReading,
    /// 前回の指針（基準レコードから転記）
    pub previous_reading: Option<DeviceReading>,
    /// チャネルごとの消費量
    pub consumption: Option<Consumption>,
    /// チャネルごとの金額
    pub amounts: Option<ChannelAmounts>,
    /// 合計金額（sum_tot列）
    pub total_amount: Option<Decimal>,
    pub status: RecordStatus,
    /// 支払日（支払済みに設定した日）
    pub pay_date: Option<NaiveDate>,
}

impl ReadingRecord {
    /// 指針の形から判定した電力計種別
    pub fn kind(&self) -> DeviceKind {
        self.new_reading.kind()
    }

    /// 合計金額が正の値かどうか
    pub fn has_positive_total(&self) -> bool {
        self.total_amount
            .map(|total| total > Decimal::ZERO)
            .unwrap_or(false)
    }

    /// 料金の解決に使う基準日
    ///
    /// 確認済みレコードは支払日、それ以外はレコード日付
    pub fn rate_reference_date(&self) -> NaiveDate {
        match (self.status, self.pay_date) {
            (RecordStatus::Confirmed | RecordStatus::Superseded, Some(pay_date)) => pay_date,
            _ => self.record_date,
        }
    }
}

/// 指針提出用DTO
///
/// 単一料金計は `t_single_new`、二料金計は `t1_new`（昼）と `t2_new`（夜）を指定する
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SubmitReadingDto {
    pub land_plot_id: i64,
    pub t1_new: Option<u32>,
    pub t2_new: Option<u32>,
    pub t_single_new: Option<u32>,
    /// レコード日付（YYYY-MM-DD形式、省略時は今日）
    pub record_date: Option<String>,
}

impl SubmitReadingDto {
    /// 入力値を指針に変換する
    ///
    /// # 戻り値
    /// 指針、または単一・昼夜のどちらの形にも合わない場合はバリデーションエラー
    pub fn reading(&self) -> AppResult<DeviceReading> {
        Channels::from_columns(self.t1_new, self.t2_new, self.t_single_new).ok_or_else(|| {
            AppError::validation(
                "指針は単一料金（t_single_new）か昼夜（t1_new と t2_new）のどちらか一方を入力してください",
            )
        })
    }
}

/// 区画の現在の状態
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct PlotState {
    /// 未払いのレコード
    pub current_unpaid: Option<ReadingRecord>,
    /// 支払い確認待ちのレコード
    pub current_pending: Option<ReadingRecord>,
    /// 最新の確認済みレコード
    pub latest_confirmed: Option<ReadingRecord>,
}
