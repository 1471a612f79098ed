/// 電力料金機能モジュール
///
/// このモジュールは料金の管理と解決に関連する機能を提供します：
/// - 新しい料金の導入（現行フラグの付け替え）
/// - 現行料金・基準日時点の料金の解決
// サブモジュールの宣言
pub mod commands;
pub mod models;
pub mod repository;
pub mod resolver;

// モデル
pub use models::{validate_rate, IntroduceRateDto, Rate, MAX_RATE};

// コマンド
pub use commands::{get_current_rate, introduce_rate};

// リポジトリ（データベース操作）
pub use repository::{clear_current, find_all, find_current, find_latest_effective, introduce};

// 料金の解決
pub use resolver::resolve;
