use crate::features::rates::{models::*, repository};
use crate::shared::utils::today_in;
use crate::AppState;

/// 新しい料金を導入する
///
/// # 引数
/// * `dto` - 料金導入用DTO
/// * `state` - アプリケーション状態
///
/// # 戻り値
/// 導入された料金、または失敗時はエラーメッセージ
pub fn introduce_rate(dto: IntroduceRateDto, state: &AppState) -> Result<Rate, String> {
    let today = today_in(state.settings.timezone);

    let db = state.lock_db()?;

    repository::introduce(&db, dto, today).map_err(|e| {
        log::warn!("料金の導入に失敗しました: {}", e.details());
        e.into()
    })
}

/// 現行料金を取得する
///
/// # 戻り値
/// 現行料金（未設定の場合はNone）、または失敗時はエラーメッセージ
pub fn get_current_rate(state: &AppState) -> Result<Option<Rate>, String> {
    let db = state.lock_db()?;

    repository::find_current(&db).map_err(|e| e.into())
}
