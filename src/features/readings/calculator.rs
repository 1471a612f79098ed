use super::rejection::Rejection;
use crate::features::plots::{ChannelAmounts, Consumption, DeviceReading};
use crate::features::rates::Rate;
use crate::shared::utils::round_money;
use rust_decimal::Decimal;
use serde::Serialize;

/// 金額列の上限値（整数5桁・小数2桁）
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(9_999_999, 0, 0, false, 2);

/// 支払い計算の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentBreakdown {
    pub consumption: Consumption,
    pub amounts: ChannelAmounts,
    pub total: Decimal,
}

/// 消費量と金額を計算する
///
/// 消費量 = 今回指針 − 前回指針（チャネルごと）、
/// 金額 = 消費量 × チャネル料金（小数2桁に丸める）、合計 = 金額の和
///
/// # 引数
/// * `new_reading` - 今回の指針
/// * `previous` - 前回の指針
/// * `rate` - 適用する料金
///
/// # 戻り値
/// 計算結果、または形式不一致・逆行・金額上限超過の場合は業務ルール違反
pub fn compute(
    new_reading: DeviceReading,
    previous: DeviceReading,
    rate: &Rate,
) -> Result<PaymentBreakdown, Rejection> {
    if !new_reading.strictly_exceeds(&previous) {
        if new_reading.kind() != previous.kind() {
            return Err(Rejection::DeviceKindMismatch {
                expected: previous.kind(),
                actual: new_reading.kind(),
            });
        }
        return Err(Rejection::NotMonotonic {
            previous,
            submitted: new_reading,
        });
    }

    let consumption = new_reading
        .zip_with(previous, |new, prev| new - prev)
        .ok_or(Rejection::DeviceKindMismatch {
            expected: previous.kind(),
            actual: new_reading.kind(),
        })?;

    let channel_rates = rate.for_kind(consumption.kind());
    let amounts = consumption
        .zip_with(channel_rates, |kwh, price| round_money(Decimal::from(kwh) * price))
        .ok_or(Rejection::NoApplicableRate)?;

    if !amounts.all(|amount| *amount <= MAX_AMOUNT) {
        return Err(Rejection::AmountOutOfRange);
    }

    let total = round_money(amounts.total());
    if total > MAX_AMOUNT {
        return Err(Rejection::AmountOutOfRange);
    }

    Ok(PaymentBreakdown {
        consumption,
        amounts,
        total,
    })
}
