/// データベース接続とスキーマ管理
pub mod connection;

/// トランザクション管理
pub mod transaction;

#[cfg(test)]
pub mod fixtures;

pub use connection::{create_tables, initialize_database, open_in_memory};
pub use transaction::{is_unique_violation, with_immediate_transaction};
