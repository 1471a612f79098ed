use super::status::{RecordStatus, StatusEvent};
use crate::features::plots::{DeviceKind, DeviceReading};
use chrono::NaiveDate;
use thiserror::Error;

/// 業務ルール違反
///
/// 呼び出し側（表示層）がメッセージ表示の要否を判断する。
/// 違反が返された時点で永続化された状態は変更されていない。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("レコードのステータスが{actual}のため処理できません（{expected}である必要があります）")]
    UnexpectedStatus {
        expected: RecordStatus,
        actual: RecordStatus,
    },

    #[error("{from}のレコードに「{event}」は適用できません")]
    InvalidTransition {
        from: RecordStatus,
        event: StatusEvent,
    },

    #[error("区画に他のレコードが存在するため初期指針に設定できません")]
    NotSoleRecord,

    #[error("区画に{0}のレコードが既に存在します")]
    OpenRecordExists(RecordStatus),

    #[error("基準となる確認済みレコードまたは初期指針がありません")]
    NoBaseline,

    #[error("新しい指針（{submitted}）は前回の指針（{previous}）より大きい必要があります")]
    NotMonotonic {
        previous: DeviceReading,
        submitted: DeviceReading,
    },

    #[error("レコード日付（{submitted}）は基準レコードの日付（{baseline}）より前にできません")]
    BackdatedReading {
        baseline: NaiveDate,
        submitted: NaiveDate,
    },

    #[error("電力計の種別（{expected}）と指針の形式（{actual}）が一致しません")]
    DeviceKindMismatch {
        expected: DeviceKind,
        actual: DeviceKind,
    },

    #[error("適用できる料金がありません")]
    NoApplicableRate,

    #[error("支払い金額が0以下です")]
    NonPositiveTotal,

    #[error("金額が上限（99999.99）を超えています")]
    AmountOutOfRange,
}
