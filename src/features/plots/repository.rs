use super::models::{
    Channels, CreateLandPlotDto, CreateSntDto, DeviceKind, DeviceReading, InstallDeviceDto,
    LandPlot, MeteringDevice, Snt,
};
use crate::features::readings::{
    ledger, repository as readings_repository, Rejection, RecordStatus,
};
use crate::shared::database::with_immediate_transaction;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{format_date, optional_date_from_sql};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PLOT_COLUMNS: &str = "id, plot_number, plot_area, user_account, snt_id, electric_meter_id";

const DEVICE_COLUMNS: &str =
    "id, model, serial_number, model_type, acceptance_date, t1, t2, t_single";

fn plot_from_row(row: &Row) -> rusqlite::Result<LandPlot> {
    Ok(LandPlot {
        id: row.get(0)?,
        plot_number: row.get(1)?,
        plot_area: row.get(2)?,
        user_account: row.get(3)?,
        snt_id: row.get(4)?,
        electric_meter_id: row.get(5)?,
    })
}

fn device_from_row(row: &Row) -> rusqlite::Result<MeteringDevice> {
    let model_type: String = row.get(3)?;
    let baseline: DeviceReading = Channels::from_columns(row.get(5)?, row.get(6)?, row.get(7)?)
        .filter(|reading| DeviceKind::from_code(&model_type) == Some(reading.kind()))
        .ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(3, "model_type".to_string(), rusqlite::types::Type::Text)
        })?;

    Ok(MeteringDevice {
        id: row.get(0)?,
        model: row.get(1)?,
        serial_number: row.get(2)?,
        acceptance_date: optional_date_from_sql(row.get(4)?)?,
        baseline,
    })
}

/// 組合を作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `dto` - 組合作成用DTO
///
/// # 戻り値
/// 作成された組合、または失敗時はエラー
pub fn create_snt(conn: &Connection, dto: CreateSntDto) -> AppResult<Snt> {
    conn.execute(
        "INSERT INTO snts (name, personal_acc, bank_name, bic, corresp_acc, inn, kpp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            dto.name,
            dto.personal_acc,
            dto.bank_name,
            dto.bic,
            dto.corresp_acc,
            dto.inn,
            dto.kpp
        ],
    )?;

    find_snt_by_id(conn, conn.last_insert_rowid())
}

/// IDで組合を取得する
pub fn find_snt_by_id(conn: &Connection, id: i64) -> AppResult<Snt> {
    conn.query_row(
        "SELECT id, name, personal_acc, bank_name, bic, corresp_acc, inn, kpp
         FROM snts WHERE id = ?1",
        params![id],
        |row| {
            Ok(Snt {
                id: row.get(0)?,
                name: row.get(1)?,
                personal_acc: row.get(2)?,
                bank_name: row.get(3)?,
                bic: row.get(4)?,
                corresp_acc: row.get(5)?,
                inn: row.get(6)?,
                kpp: row.get(7)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::not_found(format!("ID {id} の組合")),
        _ => AppError::from(e),
    })
}

/// 区画を作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `dto` - 区画作成用DTO
///
/// # 戻り値
/// 作成された区画、または失敗時はエラー（区画番号の重複はバリデーションエラー）
pub fn create_plot(conn: &Connection, dto: CreateLandPlotDto) -> AppResult<LandPlot> {
    let plot_number = dto.plot_number.trim().to_string();
    if plot_number.is_empty() {
        return Err(AppError::validation("区画番号を入力してください"));
    }

    if find_by_number(conn, &plot_number)?.is_some() {
        return Err(AppError::validation(format!(
            "区画番号 {plot_number} は既に登録されています"
        )));
    }

    conn.execute(
        "INSERT INTO land_plots (plot_number, plot_area, user_account, snt_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![plot_number, dto.plot_area, dto.user_account, dto.snt_id],
    )?;

    find_by_id(conn, conn.last_insert_rowid())
}

/// IDで区画を取得する
///
/// # 戻り値
/// 区画、または存在しない場合はNotFoundエラー
pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<LandPlot> {
    conn.query_row(
        &format!("SELECT {PLOT_COLUMNS} FROM land_plots WHERE id = ?1"),
        params![id],
        plot_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::not_found(format!("ID {id} の区画")),
        _ => AppError::from(e),
    })
}

/// 区画番号で区画を取得する
pub fn find_by_number(conn: &Connection, plot_number: &str) -> AppResult<Option<LandPlot>> {
    let plot = conn
        .query_row(
            &format!("SELECT {PLOT_COLUMNS} FROM land_plots WHERE plot_number = ?1"),
            params![plot_number],
            plot_from_row,
        )
        .optional()?;

    Ok(plot)
}

/// ユーザーアカウントが所有する区画一覧を取得する
pub fn find_by_user(conn: &Connection, user_account: &str) -> AppResult<Vec<LandPlot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLOT_COLUMNS} FROM land_plots WHERE user_account = ?1 ORDER BY plot_number"
    ))?;

    let plots = stmt.query_map(params![user_account], plot_from_row)?;

    plots.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
}

/// IDで電力計を取得する
pub fn find_device_by_id(conn: &Connection, id: i64) -> AppResult<MeteringDevice> {
    conn.query_row(
        &format!("SELECT {DEVICE_COLUMNS} FROM metering_devices WHERE id = ?1"),
        params![id],
        device_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::not_found(format!("ID {id} の電力計")),
        _ => AppError::from(e),
    })
}

/// 区画に設置された電力計を取得する
///
/// # 戻り値
/// 電力計、または区画・電力計が存在しない場合はNotFoundエラー
pub fn device_for_plot(conn: &Connection, plot_id: i64) -> AppResult<MeteringDevice> {
    let plot = find_by_id(conn, plot_id)?;

    match plot.electric_meter_id {
        Some(device_id) => find_device_by_id(conn, device_id),
        None => Err(AppError::not_found(format!(
            "区画 {} の電力計",
            plot.plot_number
        ))),
    }
}

fn insert_device(conn: &Connection, dto: &InstallDeviceDto) -> AppResult<MeteringDevice> {
    let kind = dto.baseline.kind();
    let (t1, t2, t_single) = dto.baseline.into_columns();

    conn.execute(
        "INSERT INTO metering_devices (model, serial_number, model_type, acceptance_date, t1, t2, t_single)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            dto.model,
            dto.serial_number,
            kind.as_code(),
            dto.acceptance_date.map(format_date),
            t1,
            t2,
            t_single
        ],
    )?;

    find_device_by_id(conn, conn.last_insert_rowid())
}

fn link_device(conn: &Connection, plot_id: i64, device_id: i64) -> AppResult<()> {
    let rows_affected = conn.execute(
        "UPDATE land_plots SET electric_meter_id = ?1 WHERE id = ?2",
        params![device_id, plot_id],
    )?;

    if rows_affected == 0 {
        return Err(AppError::not_found(format!("ID {plot_id} の区画")));
    }

    Ok(())
}

/// 区画に電力計を設置する
///
/// 既に電力計がある区画には設置できない（交換は [`replace_device`] を使用する）
///
/// # 引数
/// * `conn` - データベース接続
/// * `plot_id` - 区画ID
/// * `dto` - 電力計設置用DTO
///
/// # 戻り値
/// 設置された電力計、または失敗時はエラー
pub fn install_device(
    conn: &Connection,
    plot_id: i64,
    dto: InstallDeviceDto,
) -> AppResult<MeteringDevice> {
    with_immediate_transaction(conn, |tx| {
        let plot = find_by_id(tx, plot_id)?;
        if plot.electric_meter_id.is_some() {
            return Err(AppError::validation(format!(
                "区画 {} には既に電力計が設置されています",
                plot.plot_number
            )));
        }

        let device = insert_device(tx, &dto)?;
        link_device(tx, plot_id, device.id)?;

        log::info!(
            "電力計を設置しました: plot={}, serial={}, kind={}",
            plot.plot_number,
            device.serial_number,
            device.kind().as_code()
        );

        Ok(device)
    })
}

/// 区画の電力計を交換する
///
/// 未確定のレコード（新規・支払済み）がある間は交換できない。
/// 旧電力計の行は履歴として残し、区画からの参照のみを付け替える。
/// 区画に履歴がある場合は、新しい電力計の設置時指針を初期指針として
/// 交換日付で登録し、以降の指針はそれを基準にする。
///
/// # 引数
/// * `conn` - データベース接続
/// * `plot_id` - 区画ID
/// * `dto` - 新しい電力計の設置用DTO
/// * `replaced_on` - 交換日（新しい初期指針のレコード日付）
///
/// # 戻り値
/// 新しい電力計、または失敗時はエラー
pub fn replace_device(
    conn: &Connection,
    plot_id: i64,
    dto: InstallDeviceDto,
    replaced_on: NaiveDate,
) -> AppResult<MeteringDevice> {
    with_immediate_transaction(conn, |tx| {
        let plot = find_by_id(tx, plot_id)?;

        for status in [RecordStatus::New, RecordStatus::Paid] {
            if readings_repository::count_by_status(tx, plot_id, status, None)? > 0 {
                log::warn!(
                    "未確定レコードがあるため電力計を交換できません: plot={}, status={}",
                    plot.plot_number,
                    status.as_code()
                );
                return Err(Rejection::OpenRecordExists(status).into());
            }
        }

        let has_history = readings_repository::count_for_plot(tx, plot_id, None)? > 0;

        // 履歴がある区画では指針の形式を変えられない
        if let Some(current_id) = plot.electric_meter_id.filter(|_| has_history) {
            let current = find_device_by_id(tx, current_id)?;
            if current.kind() != dto.baseline.kind() {
                return Err(Rejection::DeviceKindMismatch {
                    expected: current.kind(),
                    actual: dto.baseline.kind(),
                }
                .into());
            }
        }

        if let Some(baseline) = ledger::baseline_record(tx, plot_id)? {
            if replaced_on < baseline.record_date {
                return Err(Rejection::BackdatedReading {
                    baseline: baseline.record_date,
                    submitted: replaced_on,
                }
                .into());
            }
        }

        let device = insert_device(tx, &dto)?;
        link_device(tx, plot_id, device.id)?;

        if has_history {
            let seeded = ledger::seed_baseline(tx, plot_id, replaced_on, &device)?;
            log::info!(
                "新しい電力計の初期指針を登録しました: plot={}, record={}, reading={}",
                plot.plot_number,
                seeded.id,
                seeded.new_reading
            );
        }

        log::info!(
            "電力計を交換しました: plot={}, old={:?}, new={}",
            plot.plot_number,
            plot.electric_meter_id,
            device.id
        );

        Ok(device)
    })
}
