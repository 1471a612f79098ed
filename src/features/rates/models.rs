use crate::features::plots::{ChannelAmounts, Channels, DeviceKind};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::round_money;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 料金の上限値（整数2桁・小数2桁）
pub const MAX_RATE: Decimal = Decimal::from_parts(9999, 0, 0, false, 2);

/// 電力料金データモデル
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Rate {
    pub id: i64,
    /// 導入日
    pub intro_date: NaiveDate,
    /// 昼料金（T1）
    pub t1_rate: Decimal,
    /// 夜料金（T2）
    pub t2_rate: Decimal,
    /// 単一料金
    pub t_single_rate: Option<Decimal>,
    /// 現行料金かどうか（rate_status = 'c'）
    pub is_current: bool,
}

impl Rate {
    /// 単一料金計に適用する料金
    ///
    /// 単一料金が未設定の場合は昼料金を使用する
    pub fn single_rate(&self) -> Decimal {
        self.t_single_rate.unwrap_or(self.t1_rate)
    }

    /// 電力計種別に応じたチャネルごとの料金
    pub fn for_kind(&self, kind: DeviceKind) -> ChannelAmounts {
        match kind {
            DeviceKind::SingleRate => Channels::Single(self.single_rate()),
            DeviceKind::DualRate => Channels::DualRate {
                day: self.t1_rate,
                night: self.t2_rate,
            },
        }
    }
}

/// 料金導入用DTO
#[derive(Debug, Deserialize, Clone)]
pub struct IntroduceRateDto {
    /// 導入日（YYYY-MM-DD形式、省略時は今日）
    pub intro_date: Option<String>,
    pub t1_rate: Decimal,
    pub t2_rate: Decimal,
    pub t_single_rate: Option<Decimal>,
}

/// 料金値を検証し、小数2桁に丸める
///
/// # 引数
/// * `name` - エラーメッセージに使う項目名
/// * `value` - 料金値
///
/// # 戻り値
/// 丸めた料金、または範囲外（0以下または99.99超）の場合はバリデーションエラー
pub fn validate_rate(name: &str, value: Decimal) -> AppResult<Decimal> {
    let rounded = round_money(value);

    if rounded <= Decimal::ZERO {
        return Err(AppError::validation(format!(
            "{name}は0より大きい値を入力してください"
        )));
    }

    if rounded > MAX_RATE {
        return Err(AppError::validation(format!(
            "{name}は{MAX_RATE}以下で入力してください"
        )));
    }

    Ok(rounded)
}
