use crate::shared::errors::AppResult;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// IMMEDIATEトランザクション内で処理を実行する
///
/// 書き込みロックを最初に取得するため、件数チェックから書き込みまでの間に
/// 他の書き込みが割り込むことはない。クロージャがエラーを返した場合は
/// トランザクションを破棄してロールバックする。
///
/// # 引数
/// * `conn` - データベース接続
/// * `operation` - トランザクション内で実行する処理
///
/// # 戻り値
/// 処理の結果、または失敗時はエラー
pub fn with_immediate_transaction<T, F>(conn: &Connection, operation: F) -> AppResult<T>
where
    F: FnOnce(&Connection) -> AppResult<T>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let value = operation(&tx)?;

    tx.commit()?;
    Ok(value)
}

/// 一意制約違反かどうかを判定する
pub fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
