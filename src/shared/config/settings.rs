use crate::shared::errors::AppError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 組合の既定タイムゾーン（「今日」の判定に使用）
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Moscow;

/// 支払い確認済みレコードの履歴の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmedHistoryPolicy {
    /// 確認済みレコードをすべてそのまま残す
    #[default]
    Keep,
    /// 新しい確認時に、以前の確認済みレコードを「置換済み」に変更する
    Supersede,
}

impl FromStr for ConfirmedHistoryPolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "supersede" => Ok(Self::Supersede),
            other => Err(AppError::configuration(format!(
                "SNT_CONFIRMED_HISTORY の値が不正です: {other}（keep または supersede）"
            ))),
        }
    }
}

/// 適用料金の解決方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateResolution {
    /// 「現行」フラグの付いた料金のみを使用する
    #[default]
    CurrentFlag,
    /// 基準日以前に導入された最新の料金を使用する
    ByDate,
}

impl FromStr for RateResolution {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "current" => Ok(Self::CurrentFlag),
            "by_date" => Ok(Self::ByDate),
            other => Err(AppError::configuration(format!(
                "SNT_RATE_RESOLUTION の値が不正です: {other}（current または by_date）"
            ))),
        }
    }
}

/// 台帳操作に渡す動作設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerSettings {
    /// 「今日」を判定するタイムゾーン
    pub timezone: Tz,
    /// 確認済みレコードの履歴ポリシー
    pub confirmed_history: ConfirmedHistoryPolicy,
    /// 料金の解決方法
    pub rate_resolution: RateResolution,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            confirmed_history: ConfirmedHistoryPolicy::default(),
            rate_resolution: RateResolution::default(),
        }
    }
}

impl LedgerSettings {
    /// 履歴ポリシーを差し替えた設定を返す
    pub fn with_confirmed_history(mut self, policy: ConfirmedHistoryPolicy) -> Self {
        self.confirmed_history = policy;
        self
    }

    /// 料金の解決方法を差し替えた設定を返す
    pub fn with_rate_resolution(mut self, resolution: RateResolution) -> Self {
        self.rate_resolution = resolution;
        self
    }
}

/// タイムゾーン名を解析する
///
/// # 引数
/// * `name` - IANAタイムゾーン名（例: Europe/Moscow）
///
/// # 戻り値
/// タイムゾーン、または不正な名前の場合は設定エラー
pub fn parse_timezone(name: &str) -> Result<Tz, AppError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| AppError::configuration(format!("SNT_TIMEZONE の値が不正です: {e}")))
}
