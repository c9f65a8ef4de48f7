//! SQLite storage for polls, options and votes

mod transaction;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::application::errors::StorageError;
use crate::domain::entities::{Poll, PollId, PollOption, Vote};
use crate::domain::traits::{PollStore, VoteStore};

pub use transaction::with_transaction;

/// Default time a statement waits on a locked database before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Storage gateway backed by a single SQLite connection.
///
/// Calls run on the blocking thread pool. The mutex only hands out the
/// connection; atomicity of multi-row writes comes from SQLite transactions.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        init_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StorageError::Unavailable("connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StorageError::Unavailable(format!("storage worker failed: {}", e)))?
    }
}

fn init_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS polls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            creator TEXT NOT NULL,
            channel TEXT NOT NULL,
            is_finished INTEGER NOT NULL DEFAULT 0,
            is_multi_vote INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS options (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            poll_id INTEGER NOT NULL REFERENCES polls(id),
            name TEXT NOT NULL CHECK (length(name) > 0),
            num INTEGER NOT NULL,
            UNIQUE (poll_id, num)
        );

        CREATE TABLE IF NOT EXISTS votes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            poll_id INTEGER NOT NULL REFERENCES polls(id),
            voter TEXT NOT NULL,
            options TEXT NOT NULL,
            UNIQUE (poll_id, voter)
        );

        CREATE INDEX IF NOT EXISTS idx_options_poll ON options(poll_id);
        CREATE INDEX IF NOT EXISTS idx_votes_poll ON votes(poll_id);",
    )
}

fn poll_from_row(row: &Row<'_>) -> rusqlite::Result<Poll> {
    Ok(Poll {
        id: row.get(0)?,
        name: row.get(1)?,
        creator: row.get(2)?,
        channel: row.get(3)?,
        is_finished: row.get(4)?,
        is_multi_vote: row.get(5)?,
    })
}

fn vote_from_row(row: &Row<'_>) -> rusqlite::Result<Vote> {
    let raw: String = row.get(3)?;
    let options = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Vote {
        id: row.get(0)?,
        poll_id: row.get(1)?,
        voter: row.get(2)?,
        options,
    })
}

fn insert_poll(conn: &Connection, poll: Poll) -> Result<Poll, StorageError> {
    conn.execute(
        "INSERT INTO polls (name, creator, channel, is_finished, is_multi_vote)
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![poll.name, poll.creator, poll.channel, poll.is_multi_vote],
    )?;

    Ok(Poll {
        id: conn.last_insert_rowid(),
        is_finished: false,
        ..poll
    })
}

fn insert_options(
    conn: &Connection,
    poll_id: PollId,
    options: Vec<PollOption>,
) -> Result<Vec<PollOption>, StorageError> {
    let mut stmt = conn.prepare("INSERT INTO options (poll_id, name, num) VALUES (?1, ?2, ?3)")?;

    let mut created = Vec::with_capacity(options.len());
    for (index, option) in options.into_iter().enumerate() {
        let num = index as u32 + 1;
        stmt.execute(params![poll_id, option.name, num])?;
        created.push(PollOption {
            id: conn.last_insert_rowid(),
            poll_id,
            name: option.name,
            num,
        });
    }
    Ok(created)
}

fn select_poll(conn: &Connection, poll_id: PollId) -> Result<Poll, StorageError> {
    conn.query_row(
        "SELECT id, name, creator, channel, is_finished, is_multi_vote FROM polls WHERE id = ?1",
        [poll_id],
        poll_from_row,
    )
    .optional()?
    .ok_or(StorageError::PollNotFound(poll_id))
}

/// Why a write guarded on an open poll touched no rows
fn closed_poll_error(conn: &Connection, poll_id: PollId) -> StorageError {
    match select_poll(conn, poll_id) {
        Ok(_) => StorageError::PollFinished(poll_id),
        Err(e) => e,
    }
}

#[async_trait]
impl PollStore for Database {
    async fn create_poll_with_options(
        &self,
        poll: Poll,
        options: Vec<PollOption>,
    ) -> Result<(Poll, Vec<PollOption>), StorageError> {
        self.run(move |conn| {
            with_transaction(conn, "create_poll_with_options", |tx| {
                let poll = insert_poll(tx, poll)?;
                let options = insert_options(tx, poll.id, options)?;
                Ok((poll, options))
            })
        })
        .await
    }

    async fn get_poll(&self, poll_id: PollId) -> Result<Poll, StorageError> {
        self.run(move |conn| select_poll(conn, poll_id)).await
    }

    async fn finish_poll(&self, poll_id: PollId) -> Result<(), StorageError> {
        self.run(move |conn| {
            let rows = conn.execute("UPDATE polls SET is_finished = 1 WHERE id = ?1", [poll_id])?;
            if rows == 0 {
                return Err(StorageError::PollNotFound(poll_id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_poll(&self, poll_id: PollId) -> Result<(), StorageError> {
        self.run(move |conn| {
            with_transaction(conn, "delete_poll", |tx| {
                tx.execute("DELETE FROM votes WHERE poll_id = ?1", [poll_id])?;
                tx.execute("DELETE FROM options WHERE poll_id = ?1", [poll_id])?;
                let rows = tx.execute("DELETE FROM polls WHERE id = ?1", [poll_id])?;
                if rows == 0 {
                    return Err(StorageError::PollNotFound(poll_id));
                }
                Ok(())
            })
        })
        .await
    }
}

#[async_trait]
impl VoteStore for Database {
    async fn get_poll(&self, poll_id: PollId) -> Result<Poll, StorageError> {
        PollStore::get_poll(self, poll_id).await
    }

    async fn get_options(&self, poll_id: PollId) -> Result<Vec<PollOption>, StorageError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, poll_id, name, num FROM options WHERE poll_id = ?1 ORDER BY num",
            )?;
            let options = stmt
                .query_map([poll_id], |row| {
                    Ok(PollOption {
                        id: row.get(0)?,
                        poll_id: row.get(1)?,
                        name: row.get(2)?,
                        num: row.get(3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            if options.is_empty() {
                return Err(StorageError::NoOptionsFound(poll_id));
            }
            Ok(options)
        })
        .await
    }

    async fn cast_vote(
        &self,
        poll_id: PollId,
        voter: &str,
        options: &[u32],
    ) -> Result<Vote, StorageError> {
        let voter = voter.to_string();
        let encoded =
            serde_json::to_string(options).map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.run(move |conn| {
            with_transaction(conn, "cast_vote", |tx| {
                // Upsert only while the poll is open; a repeat vote replaces the stored choice
                let vote = tx
                    .query_row(
                        "INSERT INTO votes (poll_id, voter, options)
                         SELECT ?1, ?2, ?3
                         WHERE EXISTS (SELECT 1 FROM polls WHERE id = ?1 AND is_finished = 0)
                         ON CONFLICT (poll_id, voter) DO UPDATE SET options = excluded.options
                         RETURNING id, poll_id, voter, options",
                        params![poll_id, voter, encoded],
                        vote_from_row,
                    )
                    .optional()?;

                match vote {
                    Some(vote) => Ok(vote),
                    None => Err(closed_poll_error(tx, poll_id)),
                }
            })
        })
        .await
    }

    async fn retract_vote(&self, voter: &str, poll_id: PollId) -> Result<bool, StorageError> {
        let voter = voter.to_string();
        self.run(move |conn| {
            with_transaction(conn, "retract_vote", |tx| {
                let rows = tx.execute(
                    "DELETE FROM votes WHERE poll_id = ?1 AND voter = ?2
                     AND EXISTS (SELECT 1 FROM polls WHERE id = ?1 AND is_finished = 0)",
                    params![poll_id, voter],
                )?;
                if rows > 0 {
                    return Ok(true);
                }

                match select_poll(tx, poll_id) {
                    Ok(poll) if poll.is_finished => Err(StorageError::PollFinished(poll_id)),
                    Ok(_) => Ok(false),
                    Err(e) => Err(e),
                }
            })
        })
        .await
    }

    async fn get_votes(&self, poll_id: PollId) -> Result<Vec<Vote>, StorageError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, poll_id, voter, options FROM votes WHERE poll_id = ?1 ORDER BY id",
            )?;
            let votes = stmt
                .query_map([poll_id], vote_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            if votes.is_empty() {
                return Err(StorageError::NoVotes(poll_id));
            }
            Ok(votes)
        })
        .await
    }
}
