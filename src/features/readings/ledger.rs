use super::calculator;
use super::models::{PlotState, ReadingRecord};
use super::rejection::Rejection;
use super::repository;
use super::status::{transition, RecordStatus, StatusEvent};
use crate::features::plots::{self, Channels, DeviceReading, MeteringDevice};
use crate::features::rates::resolver;
use crate::shared::config::{ConfirmedHistoryPolicy, LedgerSettings};
use crate::shared::database::with_immediate_transaction;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::today_in;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::Connection;

/// 違反をログに残してエラーに変換する
fn reject<T>(record: &ReadingRecord, rejection: Rejection) -> AppResult<T> {
    log::warn!(
        "レコードの処理を拒否しました: id={}, plot={}, reason={rejection}",
        record.id,
        record.land_plot_id
    );
    Err(rejection.into())
}

fn require_status(record: &ReadingRecord, expected: RecordStatus) -> AppResult<()> {
    if record.status != expected {
        return reject(
            record,
            Rejection::UnexpectedStatus {
                expected,
                actual: record.status,
            },
        );
    }
    Ok(())
}

/// 保存済みのレコードを読み直す
fn reload(conn: &Connection, record: &ReadingRecord) -> AppResult<ReadingRecord> {
    repository::find_by_id(conn, record.id)
}

fn next_status(record: &ReadingRecord, event: StatusEvent) -> AppResult<RecordStatus> {
    match transition(record.status, event) {
        Ok(status) => Ok(status),
        Err(rejection) => reject(record, rejection),
    }
}

/// 新規レコードを初期指針（履歴の起点）に設定する
///
/// 区画に他のレコードがない場合のみ適用できる。消費量と金額は0になる。
///
/// # 引数
/// * `conn` - データベース接続
/// * `record` - 対象レコード（成功時のみ更新される）
///
/// # 戻り値
/// 成功時はOk(())、ステータス不一致や他レコードがある場合は業務ルール違反
pub fn mark_initial(conn: &Connection, record: &mut ReadingRecord) -> AppResult<()> {
    with_immediate_transaction(conn, |tx| {
        let stored = reload(tx, record)?;
        let status = next_status(&stored, StatusEvent::MarkInitial)?;

        if repository::count_for_plot(tx, stored.land_plot_id, Some(stored.id))? > 0 {
            return reject(&stored, Rejection::NotSoleRecord);
        }

        *record = apply_initial(tx, stored, status)?;
        Ok(())
    })
}

/// 消費量と金額を0にして初期指針として保存する
fn apply_initial(
    conn: &Connection,
    stored: ReadingRecord,
    status: RecordStatus,
) -> AppResult<ReadingRecord> {
    let kind = stored.kind();
    let mut updated = stored;
    updated.previous_reading = None;
    updated.consumption = Some(Channels::filled(kind, 0));
    updated.amounts = Some(Channels::filled(kind, Decimal::ZERO));
    updated.total_amount = Some(Decimal::ZERO);
    updated.status = status;

    repository::save(conn, &updated)?;

    log::info!(
        "初期指針を設定しました: id={}, plot={}, reading={}",
        updated.id,
        updated.land_plot_id,
        updated.new_reading
    );

    Ok(updated)
}

/// 電力計の指針から初期指針レコードを登録する
///
/// 呼び出し側のトランザクション内で使う。区画の既存レコードは検査しない。
///
/// # 引数
/// * `conn` - データベース接続（トランザクション）
/// * `land_plot_id` - 区画ID
/// * `record_date` - レコード日付
/// * `device` - 指針の取得元となる電力計
///
/// # 戻り値
/// 登録された初期指針レコード
pub(crate) fn seed_baseline(
    conn: &Connection,
    land_plot_id: i64,
    record_date: NaiveDate,
    device: &MeteringDevice,
) -> AppResult<ReadingRecord> {
    let record = repository::insert_new(
        conn,
        land_plot_id,
        record_date,
        Some(device.serial_number.as_str()),
        device.baseline,
    )?;
    let status = next_status(&record, StatusEvent::MarkInitial)?;
    apply_initial(conn, record, status)
}

/// 前回の指針を基準レコードから転記する
///
/// 基準は最新の確認済みレコードと最新の初期指針のうち新しい方。
/// 判定には保存済みの行を使い、成功時は`record`をその行で置き換える。
/// 他に新規・支払済みのレコードがある場合、電力計の種別が合わない場合、
/// レコード日付が基準より前の場合、今回の指針が基準を上回らない場合は違反となり、
/// レコードは変更されない。永続化は行わない。
///
/// # 引数
/// * `conn` - データベース接続
/// * `record` - 対象レコード（新規ステータス）
///
/// # 戻り値
/// 成功時はOk(())、失敗時は業務ルール違反またはエラー
pub fn fill_from_previous(conn: &Connection, record: &mut ReadingRecord) -> AppResult<()> {
    let mut stored = reload(conn, record)?;
    let previous = resolve_previous(conn, &stored)?;
    stored.previous_reading = Some(previous);
    *record = stored;
    Ok(())
}

/// 転記すべき前回指針を求める（レコードは変更しない）
fn resolve_previous(conn: &Connection, record: &ReadingRecord) -> AppResult<DeviceReading> {
    require_status(record, RecordStatus::New)?;
    ensure_no_open_records(conn, record.land_plot_id, Some(record.id))
        .or_else(|e| log_rejection(record, e))?;

    let device = plots::device_for_plot(conn, record.land_plot_id)?;
    if device.kind() != record.kind() {
        return reject(
            record,
            Rejection::DeviceKindMismatch {
                expected: device.kind(),
                actual: record.kind(),
            },
        );
    }

    let Some(baseline) = baseline_record(conn, record.land_plot_id)? else {
        return reject(record, Rejection::NoBaseline);
    };

    if baseline.new_reading.kind() != device.kind() {
        return reject(
            record,
            Rejection::DeviceKindMismatch {
                expected: device.kind(),
                actual: baseline.new_reading.kind(),
            },
        );
    }

    if let Some(rejection) = chain_violation(&baseline, record.new_reading, record.record_date) {
        return reject(record, rejection);
    }

    log::debug!(
        "前回指針を解決しました: id={}, baseline_id={}, previous={}",
        record.id,
        baseline.id,
        baseline.new_reading
    );

    Ok(baseline.new_reading)
}

fn log_rejection<T>(record: &ReadingRecord, error: AppError) -> AppResult<T> {
    match error {
        AppError::Rejected(rejection) => reject(record, rejection),
        other => Err(other),
    }
}

/// 区画に新規・支払済みのレコードがないことを確認する
fn ensure_no_open_records(
    conn: &Connection,
    land_plot_id: i64,
    exclude_id: Option<i64>,
) -> AppResult<()> {
    for status in [RecordStatus::New, RecordStatus::Paid] {
        if repository::count_by_status(conn, land_plot_id, status, exclude_id)? > 0 {
            return Err(Rejection::OpenRecordExists(status).into());
        }
    }
    Ok(())
}

/// 基準レコード（最新の確認済みと最新の初期指針のうち新しい方）
///
/// 電力計を交換すると新しい初期指針が登録され、以降はそれが基準になる。
pub(crate) fn baseline_record(
    conn: &Connection,
    land_plot_id: i64,
) -> AppResult<Option<ReadingRecord>> {
    let confirmed = latest_confirmed(conn, land_plot_id)?;
    let initial = initial_record(conn, land_plot_id)?;

    Ok(confirmed
        .into_iter()
        .chain(initial)
        .max_by_key(|record| (record.record_date, record.id)))
}

/// 基準レコードに続けられない指針・日付であれば違反を返す
fn chain_violation(
    baseline: &ReadingRecord,
    reading: DeviceReading,
    record_date: NaiveDate,
) -> Option<Rejection> {
    if record_date < baseline.record_date {
        return Some(Rejection::BackdatedReading {
            baseline: baseline.record_date,
            submitted: record_date,
        });
    }

    if !reading.strictly_exceeds(&baseline.new_reading) {
        return Some(Rejection::NotMonotonic {
            previous: baseline.new_reading,
            submitted: reading,
        });
    }

    None
}

/// 消費量と支払い金額を計算して保存する
///
/// 前回指針の転記と料金の解決がどちらも成功した場合のみレコードを更新する。
/// ステータスは新規のまま変わらない。
///
/// # 引数
/// * `conn` - データベース接続
/// * `settings` - 台帳の動作設定（料金の解決方法）
/// * `record` - 対象レコード（成功時のみ更新される）
///
/// # 戻り値
/// 成功時はOk(())、失敗時は業務ルール違反またはエラー
pub fn calculate_payment(
    conn: &Connection,
    settings: &LedgerSettings,
    record: &mut ReadingRecord,
) -> AppResult<()> {
    with_immediate_transaction(conn, |tx| {
        let stored = reload(tx, record)?;
        let previous = resolve_previous(tx, &stored)?;

        let Some(rate) =
            resolver::resolve(tx, settings.rate_resolution, stored.rate_reference_date())?
        else {
            return reject(&stored, Rejection::NoApplicableRate);
        };

        let breakdown = match calculator::compute(stored.new_reading, previous, &rate) {
            Ok(breakdown) => breakdown,
            Err(rejection) => return reject(&stored, rejection),
        };

        let mut updated = stored;
        updated.previous_reading = Some(previous);
        updated.consumption = Some(breakdown.consumption);
        updated.amounts = Some(breakdown.amounts);
        updated.total_amount = Some(breakdown.total);

        repository::save(tx, &updated)?;
        *record = updated;

        log::info!(
            "支払い金額を計算しました: id={}, plot={}, consumption={}, total={}",
            record.id,
            record.land_plot_id,
            breakdown.consumption,
            breakdown.total
        );

        Ok(())
    })
}

/// レコードを支払済みに設定する
///
/// 合計金額が正であること、区画に他の支払済みレコードがないことが条件。
/// 支払日には組合のタイムゾーンでの今日を設定する。
///
/// # 引数
/// * `conn` - データベース接続
/// * `settings` - 台帳の動作設定（タイムゾーン）
/// * `record` - 対象レコード（成功時のみ更新される）
///
/// # 戻り値
/// 成功時はOk(())、失敗時は業務ルール違反またはエラー
pub fn set_paid(
    conn: &Connection,
    settings: &LedgerSettings,
    record: &mut ReadingRecord,
) -> AppResult<()> {
    with_immediate_transaction(conn, |tx| {
        let stored = reload(tx, record)?;
        let status = next_status(&stored, StatusEvent::MarkPaid)?;

        if !stored.has_positive_total() {
            return reject(&stored, Rejection::NonPositiveTotal);
        }

        if repository::count_by_status(tx, stored.land_plot_id, RecordStatus::Paid, Some(stored.id))?
            > 0
        {
            return reject(&stored, Rejection::OpenRecordExists(RecordStatus::Paid));
        }

        let mut updated = stored;
        updated.status = status;
        updated.pay_date = Some(today_in(settings.timezone));

        repository::save(tx, &updated)?;
        *record = updated;

        log::info!(
            "支払済みに設定しました: id={}, plot={}, total={:?}, pay_date={:?}",
            record.id,
            record.land_plot_id,
            record.total_amount,
            record.pay_date
        );

        Ok(())
    })
}

/// 支払いを確認済みに設定する
///
/// 置換ポリシーが有効な場合、区画の以前の確認済みレコードは置換済みになる。
///
/// # 引数
/// * `conn` - データベース接続
/// * `settings` - 台帳の動作設定（確認済み履歴ポリシー）
/// * `record` - 対象レコード（成功時のみ更新される）
///
/// # 戻り値
/// 成功時はOk(())、失敗時は業務ルール違反またはエラー
pub fn set_payment_confirmed(
    conn: &Connection,
    settings: &LedgerSettings,
    record: &mut ReadingRecord,
) -> AppResult<()> {
    with_immediate_transaction(conn, |tx| {
        let stored = reload(tx, record)?;
        let status = next_status(&stored, StatusEvent::ConfirmPayment)?;

        if !stored.has_positive_total() {
            return reject(&stored, Rejection::NonPositiveTotal);
        }

        let mut updated = stored;
        updated.status = status;
        repository::save(tx, &updated)?;

        if settings.confirmed_history == ConfirmedHistoryPolicy::Supersede {
            let superseded_status = transition(RecordStatus::Confirmed, StatusEvent::Supersede)?;
            let superseded = repository::supersede_confirmed(
                tx,
                updated.land_plot_id,
                updated.id,
                superseded_status,
            )?;
            if superseded > 0 {
                log::info!(
                    "以前の確認済みレコードを置換済みにしました: plot={}, count={superseded}",
                    updated.land_plot_id
                );
            }
        }

        *record = updated;

        log::info!(
            "支払いを確認しました: id={}, plot={}, total={:?}",
            record.id,
            record.land_plot_id,
            record.total_amount
        );

        Ok(())
    })
}

/// 区画の最新の確認済みレコード
pub fn latest_confirmed(conn: &Connection, land_plot_id: i64) -> AppResult<Option<ReadingRecord>> {
    repository::find_latest_by_status(conn, land_plot_id, RecordStatus::Confirmed)
}

/// 区画の未払い（新規）レコード
pub fn current_unpaid(conn: &Connection, land_plot_id: i64) -> AppResult<Option<ReadingRecord>> {
    repository::find_latest_by_status(conn, land_plot_id, RecordStatus::New)
}

/// 区画の支払い確認待ちレコード
pub fn current_pending(conn: &Connection, land_plot_id: i64) -> AppResult<Option<ReadingRecord>> {
    repository::find_latest_by_status(conn, land_plot_id, RecordStatus::Paid)
}

/// 区画の初期指針レコード
pub fn initial_record(conn: &Connection, land_plot_id: i64) -> AppResult<Option<ReadingRecord>> {
    repository::find_latest_by_status(conn, land_plot_id, RecordStatus::Initial)
}

/// 区画の現在の状態（未払い・確認待ち・最新の確認済み）
pub fn plot_state(conn: &Connection, land_plot_id: i64) -> AppResult<PlotState> {
    plots::find_by_id(conn, land_plot_id)?;

    Ok(PlotState {
        current_unpaid: current_unpaid(conn, land_plot_id)?,
        current_pending: current_pending(conn, land_plot_id)?,
        latest_confirmed: latest_confirmed(conn, land_plot_id)?,
    })
}

/// 区画のレコード一覧（新しい順）
pub fn records_for_plot(conn: &Connection, land_plot_id: i64) -> AppResult<Vec<ReadingRecord>> {
    plots::find_by_id(conn, land_plot_id)?;
    repository::find_by_plot(conn, land_plot_id)
}

/// ユーザーが所有する全区画のレコード一覧（新しい順）
pub fn records_for_user(conn: &Connection, user_account: &str) -> AppResult<Vec<ReadingRecord>> {
    repository::find_by_user(conn, user_account)
}

/// 指針を提出して新規レコードを作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `land_plot_id` - 区画ID
/// * `reading` - 今回の指針
/// * `record_date` - レコード日付
///
/// # 戻り値
/// 作成されたレコード、または失敗時は業務ルール違反・NotFound・エラー
///
/// # 検証内容
/// 1. 区画と電力計の存在
/// 2. 指針の形式と電力計種別の一致
/// 3. 新規・支払済みレコードが存在しないこと
/// 4. 基準レコードがあれば、その日付以降であり指針を上回っていること
pub fn submit_reading(
    conn: &Connection,
    land_plot_id: i64,
    reading: DeviceReading,
    record_date: NaiveDate,
) -> AppResult<ReadingRecord> {
    with_immediate_transaction(conn, |tx| {
        let plot = plots::find_by_id(tx, land_plot_id)?;
        let device = plots::device_for_plot(tx, land_plot_id)?;

        let rejection = if device.kind() != reading.kind() {
            Some(Rejection::DeviceKindMismatch {
                expected: device.kind(),
                actual: reading.kind(),
            })
        } else {
            match ensure_no_open_records(tx, land_plot_id, None) {
                Err(AppError::Rejected(rejection)) => Some(rejection),
                Err(other) => return Err(other),
                Ok(()) => baseline_record(tx, land_plot_id)?
                    .and_then(|baseline| chain_violation(&baseline, reading, record_date)),
            }
        };

        if let Some(rejection) = rejection {
            log::warn!(
                "指針の提出を拒否しました: plot={}, reading={reading}, reason={rejection}",
                plot.plot_number
            );
            return Err(rejection.into());
        }

        let record = repository::insert_new(
            tx,
            land_plot_id,
            record_date,
            Some(device.serial_number.as_str()),
            reading,
        )?;

        log::info!(
            "指針を受け付けました: id={}, plot={}, reading={reading}",
            record.id,
            plot.plot_number
        );

        Ok(record)
    })
}

/// 電力計の設置時指針から初期指針レコードを作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `land_plot_id` - 区画ID
/// * `record_date` - レコード日付
///
/// # 戻り値
/// 作成された初期指針レコード、または区画に既にレコードがある場合は業務ルール違反
pub fn create_initial_record(
    conn: &Connection,
    land_plot_id: i64,
    record_date: NaiveDate,
) -> AppResult<ReadingRecord> {
    with_immediate_transaction(conn, |tx| {
        let device = plots::device_for_plot(tx, land_plot_id)?;

        if repository::count_for_plot(tx, land_plot_id, None)? > 0 {
            log::warn!("区画に既にレコードがあるため初期指針を作成できません: plot={land_plot_id}");
            return Err(Rejection::NotSoleRecord.into());
        }

        seed_baseline(tx, land_plot_id, record_date, &device)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::fixtures;
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn rejection_of(result: AppResult<()>) -> Option<Rejection> {
        result.err().and_then(|e| e.rejection().cloned())
    }

    #[test]
    fn test_mark_initial_states() {
        let (conn, plots) = fixtures::setup();

        // (n) → i
        let mut record =
            repository::insert_new(&conn, plots.single, date(1, 1), None, Channels::Single(0))
                .unwrap();
        mark_initial(&conn, &mut record).unwrap();
        assert_eq!(record.status, RecordStatus::Initial);
        assert_eq!(record.consumption, Some(Channels::Single(0)));
        assert_eq!(record.total_amount, Some(Decimal::ZERO));
        assert_eq!(repository::find_by_id(&conn, record.id).unwrap(), record);

        // (i) → 既に初期指針
        let result = mark_initial(&conn, &mut record);
        assert!(matches!(
            rejection_of(result),
            Some(Rejection::InvalidTransition { .. })
        ));

        // (i, n) → 他にレコードがある
        let mut other =
            repository::insert_new(&conn, plots.single, date(1, 2), None, Channels::Single(0))
                .unwrap();
        let before = other.clone();
        assert_eq!(
            rejection_of(mark_initial(&conn, &mut other)),
            Some(Rejection::NotSoleRecord)
        );
        assert_eq!(other, before);
        assert_eq!(other.status, RecordStatus::New);
    }

    #[test]
    fn test_fill_from_previous_states() {
        let (conn, plots) = fixtures::setup();
        let initial = create_initial_record(&conn, plots.dual, date(1, 1)).unwrap();

        // (i) → 初期指針自身は新規ではない
        let mut copy = initial.clone();
        assert!(fill_from_previous(&conn, &mut copy).is_err());

        // (i, n) → 初期指針から転記
        let mut first = repository::insert_new(
            &conn,
            plots.dual,
            date(1, 2),
            None,
            Channels::DualRate { day: 10, night: 10 },
        )
        .unwrap();
        fill_from_previous(&conn, &mut first).unwrap();
        assert_eq!(
            first.previous_reading,
            Some(Channels::DualRate { day: 0, night: 0 })
        );

        // (i, c, n) → 確認済みから転記
        first.status = RecordStatus::Confirmed;
        repository::save(&conn, &first).unwrap();
        let mut second = repository::insert_new(
            &conn,
            plots.dual,
            date(1, 3),
            None,
            Channels::DualRate { day: 20, night: 20 },
        )
        .unwrap();
        fill_from_previous(&conn, &mut second).unwrap();
        assert_eq!(
            second.previous_reading,
            Some(Channels::DualRate { day: 10, night: 10 })
        );

        // (i, c, p, n) → 支払済みがあるため不可
        second.status = RecordStatus::Paid;
        second.previous_reading = None;
        repository::save(&conn, &second).unwrap();
        let mut third = repository::insert_new(
            &conn,
            plots.dual,
            date(1, 4),
            None,
            Channels::DualRate { day: 30, night: 30 },
        )
        .unwrap();
        let before = third.clone();
        assert_eq!(
            rejection_of(fill_from_previous(&conn, &mut third)),
            Some(Rejection::OpenRecordExists(RecordStatus::Paid))
        );
        assert_eq!(third, before);
    }

    #[test]
    fn test_fill_requires_baseline() {
        let (conn, plots) = fixtures::setup();
        let mut record =
            repository::insert_new(&conn, plots.single, date(1, 1), None, Channels::Single(5))
                .unwrap();

        assert_eq!(
            rejection_of(fill_from_previous(&conn, &mut record)),
            Some(Rejection::NoBaseline)
        );
        assert_eq!(record.previous_reading, None);
    }

    #[test]
    fn test_fill_rejects_non_monotonic_without_mutation() {
        let (conn, plots) = fixtures::setup();
        create_initial_record(&conn, plots.dual, date(1, 1)).unwrap();

        let mut record = repository::insert_new(
            &conn,
            plots.dual,
            date(1, 2),
            None,
            Channels::DualRate { day: 10, night: 0 },
        )
        .unwrap();
        let before = record.clone();

        assert!(matches!(
            rejection_of(fill_from_previous(&conn, &mut record)),
            Some(Rejection::NotMonotonic { .. })
        ));
        assert_eq!(record, before);
        assert_eq!(repository::find_by_id(&conn, record.id).unwrap(), before);
    }

    #[test]
    fn test_fill_rejects_device_kind_mismatch() {
        let (conn, plots) = fixtures::setup();
        create_initial_record(&conn, plots.single, date(1, 1)).unwrap();

        // 単一料金計の区画に昼夜の指針を直接登録した場合
        let mut record = repository::insert_new(
            &conn,
            plots.single,
            date(1, 2),
            None,
            Channels::DualRate { day: 10, night: 10 },
        )
        .unwrap();

        assert!(matches!(
            rejection_of(fill_from_previous(&conn, &mut record)),
            Some(Rejection::DeviceKindMismatch { .. })
        ));
    }

    #[test]
    fn test_calculate_payment_single_and_dual() {
        let (conn, plots) = fixtures::setup();
        let settings = LedgerSettings::default();
        create_initial_record(&conn, plots.single, date(1, 1)).unwrap();
        create_initial_record(&conn, plots.dual, date(1, 1)).unwrap();

        let mut single = submit_reading(&conn, plots.single, Channels::Single(10), date(1, 2))
            .unwrap();
        calculate_payment(&conn, &settings, &mut single).unwrap();
        assert_eq!(single.previous_reading, Some(Channels::Single(0)));
        assert_eq!(single.consumption, Some(Channels::Single(10)));
        assert_eq!(single.amounts, Some(Channels::Single(dec!(55.00))));
        assert_eq!(single.total_amount, Some(dec!(55.00)));
        assert_eq!(single.status, RecordStatus::New);

        let mut dual = submit_reading(
            &conn,
            plots.dual,
            Channels::DualRate { day: 10, night: 10 },
            date(1, 2),
        )
        .unwrap();
        calculate_payment(&conn, &settings, &mut dual).unwrap();
        assert_eq!(dual.consumption, Some(Channels::DualRate { day: 10, night: 10 }));
        assert_eq!(
            dual.amounts,
            Some(Channels::DualRate {
                day: dec!(55.00),
                night: dec!(25.00)
            })
        );
        assert_eq!(dual.total_amount, Some(dec!(80.00)));
        assert_eq!(repository::find_by_id(&conn, dual.id).unwrap(), dual);
    }

    #[test]
    fn test_calculate_payment_on_initial_record_fails() {
        let (conn, plots) = fixtures::setup();
        let mut initial = create_initial_record(&conn, plots.single, date(1, 1)).unwrap();

        let result = calculate_payment(&conn, &LedgerSettings::default(), &mut initial);
        assert_eq!(
            rejection_of(result),
            Some(Rejection::UnexpectedStatus {
                expected: RecordStatus::New,
                actual: RecordStatus::Initial,
            })
        );
    }

    #[test]
    fn test_set_paid_requires_positive_total() {
        let (conn, plots) = fixtures::setup();
        let settings = LedgerSettings::default();
        create_initial_record(&conn, plots.single, date(1, 1)).unwrap();
        let mut record =
            submit_reading(&conn, plots.single, Channels::Single(10), date(1, 2)).unwrap();

        // 計算前（合計なし）
        assert_eq!(
            rejection_of(set_paid(&conn, &settings, &mut record)),
            Some(Rejection::NonPositiveTotal)
        );

        // 計算せずに合計だけ設定しても保存済みの行で判定される
        let mut forged = record.clone();
        forged.total_amount = Some(dec!(1.00));
        assert_eq!(
            rejection_of(set_paid(&conn, &settings, &mut forged)),
            Some(Rejection::NonPositiveTotal)
        );
        assert_eq!(forged.total_amount, Some(dec!(1.00)));
        let stored = repository::find_by_id(&conn, record.id).unwrap();
        assert_eq!(stored.status, RecordStatus::New);
        assert_eq!(stored.total_amount, None);

        calculate_payment(&conn, &settings, &mut record).unwrap();
        set_paid(&conn, &settings, &mut record).unwrap();
        assert_eq!(record.status, RecordStatus::Paid);
        assert_eq!(record.pay_date, Some(today_in(settings.timezone)));
    }

    #[test]
    fn test_confirm_requires_paid() {
        let (conn, plots) = fixtures::setup();
        let settings = LedgerSettings::default();
        create_initial_record(&conn, plots.single, date(1, 1)).unwrap();
        let mut record =
            submit_reading(&conn, plots.single, Channels::Single(10), date(1, 2)).unwrap();
        calculate_payment(&conn, &settings, &mut record).unwrap();

        assert!(set_payment_confirmed(&conn, &settings, &mut record).is_err());
        assert_eq!(record.status, RecordStatus::New);

        set_paid(&conn, &settings, &mut record).unwrap();
        set_payment_confirmed(&conn, &settings, &mut record).unwrap();
        assert_eq!(record.status, RecordStatus::Confirmed);

        // 2回目は不可
        assert!(matches!(
            rejection_of(set_payment_confirmed(&conn, &settings, &mut record)),
            Some(Rejection::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_submit_reading_rejections() {
        let (conn, plots) = fixtures::setup();
        create_initial_record(&conn, plots.dual, date(1, 1)).unwrap();

        // 種別不一致
        let result = submit_reading(&conn, plots.dual, Channels::Single(10), date(1, 2));
        assert!(matches!(
            result.unwrap_err().rejection(),
            Some(Rejection::DeviceKindMismatch { .. })
        ));

        // 逆行（夜のみ増加）
        let result = submit_reading(
            &conn,
            plots.dual,
            Channels::DualRate { day: 0, night: 5 },
            date(1, 2),
        );
        assert!(matches!(
            result.unwrap_err().rejection(),
            Some(Rejection::NotMonotonic { .. })
        ));

        // 新規レコードの重複
        submit_reading(
            &conn,
            plots.dual,
            Channels::DualRate { day: 5, night: 5 },
            date(1, 2),
        )
        .unwrap();
        let result = submit_reading(
            &conn,
            plots.dual,
            Channels::DualRate { day: 6, night: 6 },
            date(1, 3),
        );
        assert_eq!(
            result.unwrap_err().rejection(),
            Some(&Rejection::OpenRecordExists(RecordStatus::New))
        );

        // 存在しない区画
        let result = submit_reading(&conn, 999, Channels::Single(1), date(1, 2));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_submit_records_counter_number() {
        let (conn, plots) = fixtures::setup();
        create_initial_record(&conn, plots.single, date(1, 1)).unwrap();

        let record = submit_reading(&conn, plots.single, Channels::Single(3), date(1, 2)).unwrap();
        assert_eq!(record.counter_number.as_deref(), Some(fixtures::SINGLE_SERIAL));
    }

    #[test]
    fn test_create_initial_record_only_once() {
        let (conn, plots) = fixtures::setup();

        let initial = create_initial_record(&conn, plots.dual, date(1, 1)).unwrap();
        assert_eq!(initial.status, RecordStatus::Initial);
        assert_eq!(initial.new_reading, Channels::DualRate { day: 0, night: 0 });
        assert_eq!(initial_record(&conn, plots.dual).unwrap(), Some(initial));

        let result = create_initial_record(&conn, plots.dual, date(1, 2));
        assert_eq!(
            result.unwrap_err().rejection(),
            Some(&Rejection::NotSoleRecord)
        );
        assert_eq!(repository::count_for_plot(&conn, plots.dual, None).unwrap(), 1);
    }

    #[test]
    fn test_plot_state_and_listing() {
        let (conn, plots) = fixtures::setup();
        let settings = LedgerSettings::default();

        assert_eq!(plot_state(&conn, plots.single).unwrap(), PlotState::default());
        assert!(matches!(plot_state(&conn, 999), Err(AppError::NotFound(_))));

        create_initial_record(&conn, plots.single, date(1, 1)).unwrap();
        let mut record =
            submit_reading(&conn, plots.single, Channels::Single(10), date(1, 2)).unwrap();
        calculate_payment(&conn, &settings, &mut record).unwrap();

        let state = plot_state(&conn, plots.single).unwrap();
        assert_eq!(state.current_unpaid, Some(record.clone()));
        assert_eq!(state.current_pending, None);

        set_paid(&conn, &settings, &mut record).unwrap();
        let state = plot_state(&conn, plots.single).unwrap();
        assert_eq!(state.current_unpaid, None);
        assert_eq!(state.current_pending, Some(record.clone()));

        set_payment_confirmed(&conn, &settings, &mut record).unwrap();
        let state = plot_state(&conn, plots.single).unwrap();
        assert_eq!(state.latest_confirmed, Some(record.clone()));

        let records = records_for_plot(&conn, plots.single).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, record.id);
        assert_eq!(records_for_user(&conn, fixtures::OWNER).unwrap().len(), 2);
    }

    #[test]
    fn test_stale_copy_cannot_rewind_status() {
        let (conn, plots) = fixtures::setup();
        let settings = LedgerSettings::default();
        create_initial_record(&conn, plots.single, date(1, 1)).unwrap();
        let mut record =
            submit_reading(&conn, plots.single, Channels::Single(10), date(1, 2)).unwrap();
        calculate_payment(&conn, &settings, &mut record).unwrap();

        let mut stale = record.clone();
        set_paid(&conn, &settings, &mut record).unwrap();
        set_payment_confirmed(&conn, &settings, &mut record).unwrap();

        // 古いコピーはまだ新規ステータスを持っている
        assert_eq!(stale.status, RecordStatus::New);
        assert_eq!(
            rejection_of(set_paid(&conn, &settings, &mut stale)),
            Some(Rejection::InvalidTransition {
                from: RecordStatus::Confirmed,
                event: StatusEvent::MarkPaid,
            })
        );
        assert!(matches!(
            rejection_of(calculate_payment(&conn, &settings, &mut stale)),
            Some(Rejection::UnexpectedStatus { .. })
        ));
        assert_eq!(stale.status, RecordStatus::New);
        assert_eq!(repository::find_by_id(&conn, record.id).unwrap(), record);
    }

    #[test]
    fn test_operations_return_the_stored_row() {
        let (conn, plots) = fixtures::setup();
        let settings = LedgerSettings::default();
        create_initial_record(&conn, plots.single, date(1, 1)).unwrap();
        let record =
            submit_reading(&conn, plots.single, Channels::Single(10), date(1, 2)).unwrap();

        // 呼び出し側で書き換えた値は保存されない
        let mut edited = record.clone();
        edited.new_reading = Channels::Single(500);
        edited.pay_date = Some(date(1, 3));
        calculate_payment(&conn, &settings, &mut edited).unwrap();

        assert_eq!(edited.new_reading, Channels::Single(10));
        assert_eq!(edited.pay_date, None);
        assert_eq!(edited.total_amount, Some(dec!(55.00)));
        assert_eq!(repository::find_by_id(&conn, record.id).unwrap(), edited);
    }

    #[test]
    fn test_submit_rejects_date_before_baseline() {
        let (conn, plots) = fixtures::setup();
        let settings = LedgerSettings::default();
        create_initial_record(&conn, plots.single, date(1, 1)).unwrap();

        let mut first =
            submit_reading(&conn, plots.single, Channels::Single(100), date(3, 1)).unwrap();
        calculate_payment(&conn, &settings, &mut first).unwrap();
        set_paid(&conn, &settings, &mut first).unwrap();
        set_payment_confirmed(&conn, &settings, &mut first).unwrap();

        let result = submit_reading(&conn, plots.single, Channels::Single(150), date(2, 1));
        assert_eq!(
            result.unwrap_err().rejection(),
            Some(&Rejection::BackdatedReading {
                baseline: date(3, 1),
                submitted: date(2, 1),
            })
        );
        assert_eq!(current_unpaid(&conn, plots.single).unwrap(), None);

        // 同じ日付は受け付ける
        let record =
            submit_reading(&conn, plots.single, Channels::Single(120), date(3, 1)).unwrap();
        assert_eq!(record.status, RecordStatus::New);
    }

    #[test]
    fn test_fill_rejects_record_dated_before_baseline() {
        let (conn, plots) = fixtures::setup();
        create_initial_record(&conn, plots.single, date(2, 1)).unwrap();

        // 直接登録された過去日付のレコード
        let mut record =
            repository::insert_new(&conn, plots.single, date(1, 15), None, Channels::Single(5))
                .unwrap();
        let before = record.clone();

        assert!(matches!(
            rejection_of(fill_from_previous(&conn, &mut record)),
            Some(Rejection::BackdatedReading { .. })
        ));
        assert_eq!(record, before);
    }

    #[test]
    fn test_baseline_prefers_newest_record() {
        let (conn, plots) = fixtures::setup();
        let settings = LedgerSettings::default();
        let initial = create_initial_record(&conn, plots.single, date(1, 1)).unwrap();
        assert_eq!(baseline_record(&conn, plots.single).unwrap(), Some(initial));

        let mut record =
            submit_reading(&conn, plots.single, Channels::Single(10), date(2, 1)).unwrap();
        calculate_payment(&conn, &settings, &mut record).unwrap();
        set_paid(&conn, &settings, &mut record).unwrap();
        set_payment_confirmed(&conn, &settings, &mut record).unwrap();
        assert_eq!(baseline_record(&conn, plots.single).unwrap(), Some(record.clone()));

        // 交換後の初期指針が確認済みより新しければそちらが基準
        let device = plots::device_for_plot(&conn, plots.single).unwrap();
        let seeded = seed_baseline(&conn, plots.single, date(3, 1), &device).unwrap();
        assert_eq!(seeded.status, RecordStatus::Initial);
        assert_eq!(baseline_record(&conn, plots.single).unwrap(), Some(seeded));
    }
}
