//! Storage gateway tests against in-memory SQLite

use super::*;

fn count(db: &Database, sql: &str, poll_id: PollId) -> i64 {
    let conn = db.conn.lock().unwrap();
    conn.query_row(sql, [poll_id], |row| row.get(0)).unwrap()
}

fn count_polls(db: &Database) -> i64 {
    let conn = db.conn.lock().unwrap();
    conn.query_row("SELECT COUNT(*) FROM polls", [], |row| row.get(0)).unwrap()
}

async fn create(db: &Database, names: &[&str], multi: bool) -> (Poll, Vec<PollOption>) {
    let poll = Poll::new("Lunch", "alice", "town-square").with_multi_vote(multi);
    db.create_poll_with_options(poll, PollOption::from_names(names.iter().copied()))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_poll_round_trip() {
    let db = Database::open_in_memory().unwrap();
    let (poll, options) = create(&db, &["Pizza", "Sushi", "Tacos"], true).await;

    assert!(poll.id > 0);
    assert!(!poll.is_finished);

    let stored = PollStore::get_poll(&db, poll.id).await.unwrap();
    assert_eq!(stored, poll);
    assert_eq!(stored.name, "Lunch");
    assert_eq!(stored.creator, "alice");
    assert_eq!(stored.channel, "town-square");
    assert!(stored.is_multi_vote);

    let nums: Vec<u32> = options.iter().map(|o| o.num).collect();
    assert_eq!(nums, vec![1, 2, 3]);
    assert!(options.iter().all(|o| o.poll_id == poll.id));

    let loaded = db.get_options(poll.id).await.unwrap();
    assert_eq!(loaded, options);
}

#[tokio::test]
async fn test_poll_ids_are_monotonic() {
    let db = Database::open_in_memory().unwrap();
    let (first, _) = create(&db, &["a"], false).await;
    db.delete_poll(first.id).await.unwrap();
    let (second, _) = create(&db, &["b"], false).await;

    assert!(second.id > first.id);
}

#[tokio::test]
async fn test_failed_option_insert_leaves_no_poll() {
    let db = Database::open_in_memory().unwrap();
    let poll = Poll::new("Broken", "alice", "town-square");

    // The empty name violates the options CHECK constraint after the poll row is written
    let result = db
        .create_poll_with_options(poll, PollOption::from_names(["ok", ""]))
        .await;

    assert!(matches!(result, Err(StorageError::Sqlite(_))));
    assert_eq!(count_polls(&db), 0);
    let conn = db.conn.lock().unwrap();
    let options: i64 = conn
        .query_row("SELECT COUNT(*) FROM options", [], |row| row.get(0))
        .unwrap();
    assert_eq!(options, 0);
}

#[tokio::test]
async fn test_get_missing_poll() {
    let db = Database::open_in_memory().unwrap();

    assert!(matches!(
        PollStore::get_poll(&db, 42).await,
        Err(StorageError::PollNotFound(42))
    ));
    assert!(matches!(db.finish_poll(42).await, Err(StorageError::PollNotFound(42))));
    assert!(matches!(db.delete_poll(42).await, Err(StorageError::PollNotFound(42))));
    assert!(matches!(db.get_options(42).await, Err(StorageError::NoOptionsFound(42))));
    assert!(matches!(db.get_votes(42).await, Err(StorageError::NoVotes(42))));
}

#[tokio::test]
async fn test_finish_poll_is_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let (poll, _) = create(&db, &["yes", "no"], false).await;

    db.finish_poll(poll.id).await.unwrap();
    db.finish_poll(poll.id).await.unwrap();

    assert!(PollStore::get_poll(&db, poll.id).await.unwrap().is_finished);
}

#[tokio::test]
async fn test_cast_vote_replaces_previous_vote() {
    let db = Database::open_in_memory().unwrap();
    let (poll, _) = create(&db, &["A", "B", "C"], true).await;

    let first = db.cast_vote(poll.id, "bob", &[1]).await.unwrap();
    let second = db.cast_vote(poll.id, "bob", &[2, 3]).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.options, vec![2, 3]);
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM votes WHERE poll_id = ?1 AND voter = 'bob'", poll.id),
        1
    );

    let votes = db.get_votes(poll.id).await.unwrap();
    assert_eq!(votes, vec![second]);
}

#[tokio::test]
async fn test_concurrent_casts_by_same_voter_keep_one_record() {
    let db = Database::open_in_memory().unwrap();
    let (poll, _) = create(&db, &["A", "B"], false).await;

    let poll_id = poll.id;
    let mut handles = Vec::new();
    for i in 0..8u32 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.cast_vote(poll_id, "carol", &[i % 2 + 1]).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let votes = db.get_votes(poll.id).await.unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].voter, "carol");
}

#[tokio::test]
async fn test_votes_by_different_voters_are_independent() {
    let db = Database::open_in_memory().unwrap();
    let (poll, _) = create(&db, &["A", "B"], false).await;

    db.cast_vote(poll.id, "bob", &[1]).await.unwrap();
    db.cast_vote(poll.id, "carol", &[2]).await.unwrap();

    let votes = db.get_votes(poll.id).await.unwrap();
    let voters: Vec<&str> = votes.iter().map(|v| v.voter.as_str()).collect();
    assert_eq!(voters, vec!["bob", "carol"]);
}

#[tokio::test]
async fn test_retract_vote() {
    let db = Database::open_in_memory().unwrap();
    let (poll, _) = create(&db, &["A", "B"], false).await;

    assert!(!db.retract_vote("bob", poll.id).await.unwrap());

    db.cast_vote(poll.id, "bob", &[2]).await.unwrap();
    assert!(db.retract_vote("bob", poll.id).await.unwrap());
    assert!(!db.retract_vote("bob", poll.id).await.unwrap());
    assert!(matches!(db.get_votes(poll.id).await, Err(StorageError::NoVotes(_))));
}

#[tokio::test]
async fn test_delete_poll_cascades() {
    let db = Database::open_in_memory().unwrap();
    let (poll, _) = create(&db, &["A", "B"], false).await;
    let (other, _) = create(&db, &["C"], false).await;
    db.cast_vote(poll.id, "bob", &[1]).await.unwrap();
    db.cast_vote(other.id, "bob", &[1]).await.unwrap();

    db.delete_poll(poll.id).await.unwrap();

    assert!(matches!(
        PollStore::get_poll(&db, poll.id).await,
        Err(StorageError::PollNotFound(_))
    ));
    assert!(matches!(db.get_options(poll.id).await, Err(StorageError::NoOptionsFound(_))));
    assert!(matches!(db.get_votes(poll.id).await, Err(StorageError::NoVotes(_))));

    // Other polls are untouched
    assert_eq!(db.get_votes(other.id).await.unwrap().len(), 1);
    assert_eq!(db.get_options(other.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reopen_file_database_keeps_polls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("votes.db");

    let poll_id = {
        let db = Database::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
        let (poll, _) = create(&db, &["A", "B"], false).await;
        db.cast_vote(poll.id, "bob", &[2]).await.unwrap();
        poll.id
    };

    let db = Database::open(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(PollStore::get_poll(&db, poll_id).await.unwrap().name, "Lunch");
    assert_eq!(db.get_votes(poll_id).await.unwrap()[0].options, vec![2]);
}

#[test]
fn test_transaction_commits_on_success() {
    let mut conn = Connection::open_in_memory().unwrap();
    init_tables(&conn).unwrap();

    let poll = with_transaction(&mut conn, "test", |tx| {
        insert_poll(tx, Poll::new("kept", "alice", "c"))
    })
    .unwrap();

    assert_eq!(select_poll(&conn, poll.id).unwrap().name, "kept");
}

#[test]
fn test_transaction_rolls_back_and_returns_cause() {
    let mut conn = Connection::open_in_memory().unwrap();
    init_tables(&conn).unwrap();

    let result: Result<(), StorageError> = with_transaction(&mut conn, "test", |tx| {
        insert_poll(tx, Poll::new("dropped", "alice", "c"))?;
        Err(StorageError::NoOptionsFound(1))
    });

    let err = result.unwrap_err();
    assert!(matches!(err, StorageError::NoOptionsFound(1)));
    assert!(!err.is_inconsistent());

    let polls: i64 = conn
        .query_row("SELECT COUNT(*) FROM polls", [], |row| row.get(0))
        .unwrap();
    assert_eq!(polls, 0);
}

#[tokio::test]
async fn test_cast_vote_on_finished_poll_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let (poll, _) = create(&db, &["A", "B"], false).await;
    db.finish_poll(poll.id).await.unwrap();

    let result = db.cast_vote(poll.id, "bob", &[1]).await;

    assert!(matches!(result, Err(StorageError::PollFinished(id)) if id == poll.id));
    assert!(matches!(db.get_votes(poll.id).await, Err(StorageError::NoVotes(_))));
}

#[tokio::test]
async fn test_cast_vote_on_missing_poll() {
    let db = Database::open_in_memory().unwrap();

    let result = db.cast_vote(7, "bob", &[1]).await;

    assert!(matches!(result, Err(StorageError::PollNotFound(7))));
}

#[tokio::test]
async fn test_retract_vote_on_finished_poll_keeps_vote() {
    let db = Database::open_in_memory().unwrap();
    let (poll, _) = create(&db, &["A", "B"], false).await;
    db.cast_vote(poll.id, "bob", &[2]).await.unwrap();
    db.finish_poll(poll.id).await.unwrap();

    let result = db.retract_vote("bob", poll.id).await;

    assert!(matches!(result, Err(StorageError::PollFinished(_))));
    assert_eq!(db.get_votes(poll.id).await.unwrap().len(), 1);
}

#[test]
fn test_failed_rollback_is_reported_inconsistent() {
    let mut conn = Connection::open_in_memory().unwrap();
    init_tables(&conn).unwrap();

    // Ending the transaction behind the handle's back makes its rollback fail
    let result: Result<(), StorageError> = with_transaction(&mut conn, "test", |tx| {
        tx.execute_batch("ROLLBACK")?;
        Err(StorageError::NoVotes(1))
    });

    let err = result.unwrap_err();
    assert!(err.is_inconsistent());
    match err {
        StorageError::Rollback { op, cause, .. } => {
            assert_eq!(op, "test");
            assert!(matches!(*cause, StorageError::NoVotes(1)));
        }
        other => panic!("expected rollback failure, got {:?}", other),
    }
}

#[test]
fn test_failed_commit_is_reported() {
    let mut conn = Connection::open_in_memory().unwrap();
    init_tables(&conn).unwrap();

    let result = with_transaction(&mut conn, "test", |tx| {
        tx.execute_batch("ROLLBACK")?;
        Ok(())
    });

    let err = result.unwrap_err();
    assert!(matches!(err, StorageError::Commit { op: "test", .. }));
    assert!(!err.is_inconsistent());
}
