use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 電力計の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// 単一料金計（T1）
    SingleRate,
    /// 昼夜二料金計（T2）
    DualRate,
}

impl DeviceKind {
    /// データベース保存用のコード
    pub fn as_code(self) -> &'static str {
        match self {
            DeviceKind::SingleRate => "T1",
            DeviceKind::DualRate => "T2",
        }
    }

    /// コードから種別を復元する
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "T1" => Some(DeviceKind::SingleRate),
            "T2" => Some(DeviceKind::DualRate),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::SingleRate => write!(f, "単一料金"),
            DeviceKind::DualRate => write!(f, "昼夜二料金"),
        }
    }
}

/// 料金チャネルごとの値
///
/// 単一料金計は1チャネル、二料金計は昼（T1）と夜（T2）の2チャネルを持つ。
/// 指針・消費量・金額のいずれも同じ形で表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channels<T> {
    Single(T),
    DualRate { day: T, night: T },
}

/// 電力計の指針値
pub type DeviceReading = Channels<u32>;

/// チャネルごとの消費量（kWh）
pub type Consumption = Channels<u32>;

/// チャネルごとの金額
pub type ChannelAmounts = Channels<Decimal>;

impl<T> Channels<T> {
    /// 値の形に対応する電力計種別
    pub fn kind(&self) -> DeviceKind {
        match self {
            Channels::Single(_) => DeviceKind::SingleRate,
            Channels::DualRate { .. } => DeviceKind::DualRate,
        }
    }

    /// 各チャネルの値を変換する
    pub fn map<U, F>(self, f: F) -> Channels<U>
    where
        F: Fn(T) -> U,
    {
        match self {
            Channels::Single(value) => Channels::Single(f(value)),
            Channels::DualRate { day, night } => Channels::DualRate {
                day: f(day),
                night: f(night),
            },
        }
    }

    /// 同じ形の2つの値をチャネルごとに組み合わせる
    ///
    /// # 戻り値
    /// 組み合わせた値、または形（種別）が異なる場合はNone
    pub fn zip_with<U, V, F>(self, other: Channels<U>, f: F) -> Option<Channels<V>>
    where
        F: Fn(T, U) -> V,
    {
        match (self, other) {
            (Channels::Single(a), Channels::Single(b)) => Some(Channels::Single(f(a, b))),
            (
                Channels::DualRate { day: a_day, night: a_night },
                Channels::DualRate { day: b_day, night: b_night },
            ) => Some(Channels::DualRate {
                day: f(a_day, b_day),
                night: f(a_night, b_night),
            }),
            _ => None,
        }
    }

    /// チャネル値をすべて満たすか判定する
    pub fn all<F>(&self, f: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        match self {
            Channels::Single(value) => f(value),
            Channels::DualRate { day, night } => f(day) && f(night),
        }
    }

    /// データベースの列（t1, t2, t_single）に分解する
    pub fn into_columns(self) -> (Option<T>, Option<T>, Option<T>) {
        match self {
            Channels::Single(value) => (None, None, Some(value)),
            Channels::DualRate { day, night } => (Some(day), Some(night), None),
        }
    }

    /// データベースの列（t1, t2, t_single）から組み立てる
    ///
    /// # 戻り値
    /// 値、または列の組み合わせが単一・昼夜のどちらにも合わない場合はNone
    pub fn from_columns(t1: Option<T>, t2: Option<T>, single: Option<T>) -> Option<Self> {
        match (t1, t2, single) {
            (None, None, Some(value)) => Some(Channels::Single(value)),
            (Some(day), Some(night), None) => Some(Channels::DualRate { day, night }),
            _ => None,
        }
    }
}

impl<T: Copy> Channels<T> {
    /// 指定種別の全チャネルを同じ値で埋める
    pub fn filled(kind: DeviceKind, value: T) -> Self {
        match kind {
            DeviceKind::SingleRate => Channels::Single(value),
            DeviceKind::DualRate => Channels::DualRate {
                day: value,
                night: value,
            },
        }
    }
}

impl Channels<u32> {
    /// すべてのチャネルで前回値を厳密に上回っているか判定する
    ///
    /// 種別が異なる場合はfalse
    pub fn strictly_exceeds(&self, previous: &Self) -> bool {
        self.zip_with(*previous, |new, prev| new > prev)
            .map(|flags| flags.all(|flag| *flag))
            .unwrap_or(false)
    }
}

impl Channels<Decimal> {
    /// 全チャネルの合計
    pub fn total(&self) -> Decimal {
        match self {
            Channels::Single(value) => *value,
            Channels::DualRate { day, night } => *day + *night,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Channels<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channels::Single(value) => write!(f, "{value}"),
            Channels::DualRate { day, night } => write!(f, "昼 {day} / 夜 {night}"),
        }
    }
}

/// 組合（СНТ）データモデル
///
/// 振込先情報は領収書・QRコードの表示に使用される
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Snt {
    pub id: i64,
    pub name: String,
    pub personal_acc: String,
    pub bank_name: String,
    pub bic: String,
    pub corresp_acc: String,
    pub inn: String,
    pub kpp: String,
}

/// 組合作成用DTO
#[derive(Debug, Deserialize, Clone)]
pub struct CreateSntDto {
    pub name: String,
    pub personal_acc: String,
    pub bank_name: String,
    pub bic: String,
    pub corresp_acc: String,
    pub inn: String,
    pub kpp: String,
}

/// 電力計データモデル
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MeteringDevice {
    pub id: i64,
    pub model: String,
    pub serial_number: String,
    pub acceptance_date: Option<NaiveDate>,
    /// 設置・受入時の指針（種別は指針の形で決まる）
    pub baseline: DeviceReading,
}

impl MeteringDevice {
    /// 電力計の種別
    pub fn kind(&self) -> DeviceKind {
        self.baseline.kind()
    }
}

/// 電力計設置用DTO
#[derive(Debug, Deserialize, Clone)]
pub struct InstallDeviceDto {
    pub model: String,
    pub serial_number: String,
    pub acceptance_date: Option<NaiveDate>,
    pub baseline: DeviceReading,
}

/// 区画データモデル
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LandPlot {
    pub id: i64,
    pub plot_number: String,
    /// 面積（平方メートル）
    pub plot_area: u32,
    /// 所有者のユーザーアカウント
    pub user_account: Option<String>,
    pub snt_id: Option<i64>,
    pub electric_meter_id: Option<i64>,
}

/// 区画作成用DTO
#[derive(Debug, Deserialize, Clone)]
pub struct CreateLandPlotDto {
    pub plot_number: String,
    pub plot_area: u32,
    pub user_account: Option<String>,
    pub snt_id: Option<i64>,
}
