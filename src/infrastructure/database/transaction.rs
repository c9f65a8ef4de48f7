//! Scoped SQLite transactions

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::application::errors::StorageError;

/// Run `body` inside one write transaction.
///
/// Commits when `body` returns `Ok`, rolls back when it returns `Err`. If the
/// rollback itself fails the result is [`StorageError::Rollback`] carrying
/// the triggering error, so callers can tell a clean failure from one that
/// may have left partial state behind. A panic inside `body` drops the
/// transaction handle, which rolls back as well.
pub fn with_transaction<T, F>(
    conn: &mut Connection,
    op: &'static str,
    body: F,
) -> Result<T, StorageError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|source| StorageError::TransactionOpen { op, source })?;

    match body(&tx) {
        Ok(value) => {
            tx.commit().map_err(|source| StorageError::Commit { op, source })?;
            Ok(value)
        }
        Err(cause) => match tx.rollback() {
            Ok(()) => {
                tracing::debug!(op, error = %cause, "transaction rolled back");
                Err(cause)
            }
            Err(source) => {
                tracing::error!(
                    op,
                    error = %source,
                    cause = %cause,
                    "rollback failed, store may be inconsistent"
                );
                Err(StorageError::Rollback {
                    op,
                    source,
                    cause: Box::new(cause),
                })
            }
        },
    }
}
