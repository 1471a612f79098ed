//! テスト用の共通データ
//!
//! 区画1は単一料金計（設置時指針0）、区画2は昼夜二料金計（設置時指針0/0）。
//! 現行料金は昼5.5・夜2.5（単一料金は未設定）。

use crate::features::plots::{self, Channels, CreateLandPlotDto, InstallDeviceDto};
use crate::features::rates::{self, IntroduceRateDto};
use crate::shared::database::open_in_memory;
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal_macros::dec;

/// 区画の所有者
pub const OWNER: &str = "sergeev";

/// 単一料金計の製造番号
pub const SINGLE_SERIAL: &str = "123456789";

/// 昼夜二料金計の製造番号
pub const DUAL_SERIAL: &str = "000000000";

/// テスト用区画のID
#[derive(Debug, Clone, Copy)]
pub struct FixturePlots {
    pub single: i64,
    pub dual: i64,
}

/// 区画・電力計・現行料金を登録したメモリ上のデータベースを作成する
pub fn setup() -> (Connection, FixturePlots) {
    let conn = open_in_memory().unwrap();
    let plots = setup_plots(&conn);

    rates::introduce(
        &conn,
        IntroduceRateDto {
            intro_date: Some("2020-01-01".to_string()),
            t1_rate: dec!(5.5),
            t2_rate: dec!(2.5),
            t_single_rate: None,
        },
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
    )
    .unwrap();

    (conn, plots)
}

/// 料金を登録せずに区画と電力計だけを作成する
pub fn setup_plots(conn: &Connection) -> FixturePlots {
    let single = plots::create_plot(
        conn,
        CreateLandPlotDto {
            plot_number: "1".to_string(),
            plot_area: 6000,
            user_account: Some(OWNER.to_string()),
            snt_id: None,
        },
    )
    .unwrap();
    plots::install_device(
        conn,
        single.id,
        InstallDeviceDto {
            model: "НЕВА".to_string(),
            serial_number: SINGLE_SERIAL.to_string(),
            acceptance_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            baseline: Channels::Single(0),
        },
    )
    .unwrap();

    let dual = plots::create_plot(
        conn,
        CreateLandPlotDto {
            plot_number: "2".to_string(),
            plot_area: 6000,
            user_account: Some(OWNER.to_string()),
            snt_id: None,
        },
    )
    .unwrap();
    plots::install_device(
        conn,
        dual.id,
        InstallDeviceDto {
            model: "НЕВА-2".to_string(),
            serial_number: DUAL_SERIAL.to_string(),
            acceptance_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            baseline: Channels::DualRate { day: 0, night: 0 },
        },
    )
    .unwrap();

    FixturePlots {
        single: single.id,
        dual: dual.id,
    }
}
