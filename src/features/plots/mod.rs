/// 区画・電力計機能モジュール
///
/// このモジュールは組合の区画台帳に関連する機能を提供します：
/// - 組合（振込先情報）の登録と取得
/// - 区画の登録と検索（区画番号・所有者）
/// - 電力計の設置と交換
/// - 料金チャネル（単一 / 昼夜）ごとの値の表現
// サブモジュールの宣言
pub mod models;
pub mod repository;

// モデル
pub use models::{
    ChannelAmounts, Channels, Consumption, CreateLandPlotDto, CreateSntDto, DeviceKind,
    DeviceReading, InstallDeviceDto, LandPlot, MeteringDevice, Snt,
};

// リポジトリ（データベース操作）
pub use repository::{
    create_plot, create_snt, device_for_plot, find_by_id, find_by_number, find_by_user,
    find_device_by_id, find_snt_by_id, install_device, replace_device,
};
