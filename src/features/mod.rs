/// 機能別モジュール
///
/// 各機能モジュールは、その機能に関連するコード（モデル、コマンド、データベース操作）
/// を含む自己完結型のユニットです。
pub mod plots;
pub mod rates;
pub mod readings;
