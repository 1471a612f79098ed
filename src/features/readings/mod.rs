/// 指針・支払い台帳機能モジュール
///
/// このモジュールは区画ごとの指針・支払いレコードの管理機能を提供します：
/// - 指針の提出と初期指針の作成
/// - 前回指針の転記、消費量・金額の計算
/// - ステータス遷移（新規 → 支払済み → 確認済み）
/// - 区画・ユーザーごとの状態とレコード一覧の取得
// サブモジュールの宣言
pub mod calculator;
pub mod commands;
pub mod ledger;
pub mod models;
pub mod rejection;
pub mod repository;
pub mod status;


// モデル
pub use models::{PlotState, ReadingRecord, SubmitReadingDto};
pub use rejection::Rejection;
pub use status::{transition, RecordStatus, StatusEvent};

// 計算
pub use calculator::{compute, PaymentBreakdown, MAX_AMOUNT};

// コマンド
pub use commands::{
    calculate_payment, confirm_payment, create_initial_record, get_plot_records,
    get_plot_state, get_user_records, mark_initial, mark_paid, submit_reading,
};
