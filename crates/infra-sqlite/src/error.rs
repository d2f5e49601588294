// sqlx::Error -> AppError (orphan rules keep this out of core)

use queueease_core::error::AppError;

// SQLite result codes: https://www.sqlite.org/rescode.html
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";
const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";
const SQLITE_BUSY: &str = "5";

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code();
            match code.as_deref() {
                Some(SQLITE_CONSTRAINT_UNIQUE) | Some(SQLITE_CONSTRAINT_PRIMARYKEY) => {
                    if db_err.message().contains("queue_entries.customer_id") {
                        AppError::Conflict(
                            "Customer already has an active queue entry".to_string(),
                        )
                    } else {
                        AppError::Conflict(format!(
                            "Unique constraint violation: {}",
                            db_err.message()
                        ))
                    }
                }
                Some(SQLITE_CONSTRAINT_FOREIGNKEY) => {
                    AppError::NotFound(format!("Referenced row missing: {}", db_err.message()))
                }
                Some(SQLITE_BUSY) => AppError::Database(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                Some(other) => {
                    AppError::Database(format!("Database error [{}]: {}", other, db_err.message()))
                }
                None => AppError::Database(format!("Database error: {}", db_err.message())),
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}
