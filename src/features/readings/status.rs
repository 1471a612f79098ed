use super::rejection::Rejection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 指針・支払いレコードのステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// 基準指針（消費量ゼロ、履歴の起点）
    Initial,
    /// 提出済み・未払い
    New,
    /// 利用者が支払い済みとして申告
    Paid,
    /// 組合が支払いを確認済み
    Confirmed,
    /// 新しい確認済みレコードに置き換えられた旧レコード
    Superseded,
}

impl RecordStatus {
    /// 全ステータス
    pub const ALL: [RecordStatus; 5] = [
        RecordStatus::Initial,
        RecordStatus::New,
        RecordStatus::Paid,
        RecordStatus::Confirmed,
        RecordStatus::Superseded,
    ];

    /// データベース保存用のコード（record_status列）
    pub fn as_code(self) -> &'static str {
        match self {
            RecordStatus::Initial => "i",
            RecordStatus::New => "n",
            RecordStatus::Paid => "p",
            RecordStatus::Confirmed => "c",
            RecordStatus::Superseded => "s",
        }
    }

    /// コードからステータスを復元する
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_code() == code)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordStatus::Initial => "初期指針",
            RecordStatus::New => "新規",
            RecordStatus::Paid => "支払済み",
            RecordStatus::Confirmed => "確認済み",
            RecordStatus::Superseded => "置換済み",
        };
        write!(f, "{label}")
    }
}

/// ステータス遷移を引き起こす操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEvent {
    MarkInitial,
    MarkPaid,
    ConfirmPayment,
    Supersede,
}

impl StatusEvent {
    pub const ALL: [StatusEvent; 4] = [
        StatusEvent::MarkInitial,
        StatusEvent::MarkPaid,
        StatusEvent::ConfirmPayment,
        StatusEvent::Supersede,
    ];
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusEvent::MarkInitial => "初期指針に設定",
            StatusEvent::MarkPaid => "支払済みに設定",
            StatusEvent::ConfirmPayment => "支払い確認",
            StatusEvent::Supersede => "置換",
        };
        write!(f, "{label}")
    }
}

/// ステータス遷移表
///
/// # 引数
/// * `current` - 現在のステータス
/// * `event` - 適用する操作
///
/// # 戻り値
/// 遷移後のステータス、または表にない組み合わせの場合は遷移不可の違反
pub fn transition(current: RecordStatus, event: StatusEvent) -> Result<RecordStatus, Rejection> {
    use RecordStatus::*;
    use StatusEvent::*;

    match (current, event) {
        (New, MarkInitial) => Ok(Initial),
        (New, MarkPaid) => Ok(Paid),
        (Paid, ConfirmPayment) => Ok(Confirmed),
        (Confirmed, Supersede) => Ok(Superseded),
        (from, event) => Err(Rejection::InvalidTransition { from, event }),
    }
}
