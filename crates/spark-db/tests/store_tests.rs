//! Store-level tests for swipe recording, match detection, teardown, and the
//! message status machine.

use std::sync::Arc;

use spark_db::swipes::SwipeOutcome;
use spark_db::{Database, StoreError};
use spark_types::models::{Decision, DeliveryStatus};
use uuid::Uuid;

fn db_with_users(n: usize) -> (Database, Vec<Uuid>) {
    let db = Database::open_in_memory().unwrap();
    let ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
    for (i, id) in ids.iter().enumerate() {
        db.create_user(
            &id.to_string(),
            &format!("user{i}@campus.edu"),
            &format!("user{i}"),
            "hash",
        )
        .unwrap();
    }
    (db, ids)
}

fn like(db: &Database, actor: Uuid, target: Uuid) -> SwipeOutcome {
    db.record_swipe(actor, target, Decision::Like).unwrap()
}

#[test]
fn one_sided_like_is_not_a_match() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    match like(&db, a, b) {
        SwipeOutcome::Recorded { matched } => assert!(matched.is_none()),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(db.matches_for_user(a).unwrap().is_empty());
}

#[test]
fn mutual_like_creates_exactly_one_match() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    let m = match like(&db, b, a) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };
    assert!(m.is_participant(a) && m.is_participant(b));

    let a_matches = db.matches_for_user(a).unwrap();
    assert_eq!(a_matches.len(), 1);
    assert_eq!(a_matches[0].id, m.id);

    let b_matches = db.matches_for_user(b).unwrap();
    assert_eq!(b_matches.len(), 1);
    assert_eq!(b_matches[0].id, m.id);
}

#[test]
fn like_plus_pass_is_not_a_match() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    db.record_swipe(b, a, Decision::Pass).unwrap();
    assert!(db.matches_for_user(a).unwrap().is_empty());
}

#[test]
fn duplicate_swipe_is_soft_and_keeps_one_row() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    // Retried request: a different decision still lands on the same PK.
    assert!(matches!(
        db.record_swipe(a, b, Decision::Pass).unwrap(),
        SwipeOutcome::Duplicate
    ));
    assert!(matches!(like(&db, a, b), SwipeOutcome::Duplicate));

    // Still only the single original like: B sees A in liked-by exactly once.
    assert_eq!(db.liked_by(b).unwrap(), vec![a]);
}

#[test]
fn concurrent_mutual_likes_produce_one_match() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);
    let db = Arc::new(db);

    let db1 = db.clone();
    let db2 = db.clone();
    let t1 = std::thread::spawn(move || like(&db1, a, b));
    let t2 = std::thread::spawn(move || like(&db2, b, a));
    t1.join().unwrap();
    t2.join().unwrap();

    let a_matches = db.matches_for_user(a).unwrap();
    let b_matches = db.matches_for_user(b).unwrap();
    assert_eq!(a_matches.len(), 1);
    assert_eq!(b_matches.len(), 1);
    assert_eq!(a_matches[0].id, b_matches[0].id);
}

#[test]
fn undo_is_idempotent() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    let first = db.undo_swipe(a, b).unwrap();
    assert!(first.removed);
    assert!(first.unmatched.is_none());

    let second = db.undo_swipe(a, b).unwrap();
    assert!(!second.removed);
    assert!(second.unmatched.is_none());
}

#[test]
fn undo_never_touches_counterpart_decision() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    like(&db, b, a);
    db.undo_swipe(a, b).unwrap();

    // B's like survives; A is still in B's outgoing likes, so re-liking
    // re-creates the match.
    match like(&db, a, b) {
        SwipeOutcome::Recorded { matched } => assert!(matched.is_some()),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn undo_tears_down_match_and_revokes_chat() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    let m = match like(&db, b, a) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };
    db.insert_message(m.id, a, "hey").unwrap();

    let undo = db.undo_swipe(a, b).unwrap();
    assert_eq!(undo.unmatched.as_ref().map(|u| u.id), Some(m.id));
    assert!(db.get_match(m.id).unwrap().is_none());

    // Chat access is gone for both sides.
    assert!(matches!(
        db.insert_message(m.id, a, "still there?"),
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        db.insert_message(m.id, b, "hello?"),
        Err(StoreError::NotFound)
    ));
}

#[test]
fn rematch_creates_a_fresh_match_id() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    let first = match like(&db, b, a) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };
    db.undo_swipe(a, b).unwrap();

    let second = match like(&db, a, b) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };
    assert_ne!(first.id, second.id);

    // Old history is not re-exposed under the new match.
    let history = db.get_messages(second.id, a, 50, None).unwrap();
    assert!(history.is_empty());
}

#[test]
fn non_participant_cannot_send() {
    let (db, ids) = db_with_users(3);
    let (a, b, outsider) = (ids[0], ids[1], ids[2]);

    like(&db, a, b);
    let m = match like(&db, b, a) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };

    assert!(matches!(
        db.insert_message(m.id, outsider, "let me in"),
        Err(StoreError::NotParticipant)
    ));
}

#[test]
fn message_status_only_moves_forward() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    let m = match like(&db, b, a) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };

    let msg = db.insert_message(m.id, a, "hey").unwrap();
    assert_eq!(msg.status, DeliveryStatus::Sent);

    db.mark_delivered(msg.id).unwrap();
    assert_eq!(db.mark_read(m.id, b).unwrap(), 1);

    // Late delivery ack after read is a no-op, never a downgrade.
    db.mark_delivered(msg.id).unwrap();
    let history = db.get_messages(m.id, b, 50, None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, DeliveryStatus::Read);

    // Re-reading reports zero new transitions.
    assert_eq!(db.mark_read(m.id, b).unwrap(), 0);
}

#[test]
fn mark_read_skips_readers_own_messages() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    let m = match like(&db, b, a) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };

    db.insert_message(m.id, a, "from a").unwrap();
    db.insert_message(m.id, b, "from b").unwrap();

    assert_eq!(db.mark_read(m.id, b).unwrap(), 1);
    let history = db.get_messages(m.id, a, 50, None).unwrap();
    let own = history.iter().find(|msg| msg.sender_id == b).unwrap();
    assert_ne!(own.status, DeliveryStatus::Read);
}

#[test]
fn fetch_marks_counterpart_messages_delivered() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    let m = match like(&db, b, a) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };

    db.insert_message(m.id, a, "offline delivery").unwrap();

    // B fetching is the receipt.
    let seen_by_b = db.get_messages(m.id, b, 50, None).unwrap();
    assert_eq!(seen_by_b[0].status, DeliveryStatus::Delivered);

    // A's own view: their message now shows delivered too.
    let seen_by_a = db.get_messages(m.id, a, 50, None).unwrap();
    assert_eq!(seen_by_a[0].status, DeliveryStatus::Delivered);
}

#[test]
fn messages_come_back_in_insertion_order() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    let m = match like(&db, b, a) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };

    for i in 0..5 {
        db.insert_message(m.id, a, &format!("msg {i}")).unwrap();
    }
    let history = db.get_messages(m.id, b, 50, None).unwrap();
    let contents: Vec<_> = history.iter().map(|msg| msg.content.as_str()).collect();
    assert_eq!(contents, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
}

#[test]
fn pagination_cursor_survives_tied_timestamps() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    let m = match like(&db, b, a) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };

    // Six messages sharing one timestamp: ordering falls entirely on rowid.
    db.with_conn(|conn| {
        for i in 0..6 {
            conn.execute(
                "INSERT INTO messages (id, match_id, sender_id, content, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'sent', '2026-03-01T12:00:00.000Z')",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    m.id.to_string(),
                    a.to_string(),
                    format!("msg {i}")
                ],
            )?;
        }
        Ok(())
    })
    .unwrap();

    // Walk backwards two at a time; every message must show up exactly once.
    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = db.get_messages(m.id, b, 2, cursor.as_deref()).unwrap();
        if page.is_empty() {
            break;
        }
        cursor = Some(page[0].id.to_string());
        for msg in page.into_iter().rev() {
            seen.push(msg.content);
        }
    }

    seen.reverse();
    let expected: Vec<String> = (0..6).map(|i| format!("msg {i}")).collect();
    assert_eq!(seen, expected);
}

#[test]
fn unknown_pagination_cursor_returns_newest_page() {
    let (db, ids) = db_with_users(2);
    let (a, b) = (ids[0], ids[1]);

    like(&db, a, b);
    let m = match like(&db, b, a) {
        SwipeOutcome::Recorded { matched: Some(m) } => m,
        other => panic!("expected match, got {other:?}"),
    };
    db.insert_message(m.id, a, "only one").unwrap();

    let bogus = Uuid::new_v4().to_string();
    let page = db.get_messages(m.id, b, 50, Some(bogus.as_str())).unwrap();
    assert_eq!(page.len(), 1);
}

#[test]
fn liked_by_lists_pending_likes_only() {
    let (db, ids) = db_with_users(3);
    let (a, b, c) = (ids[0], ids[1], ids[2]);

    like(&db, b, a);
    like(&db, c, a);
    // A already swiped back on C, so only B remains pending.
    db.record_swipe(a, c, Decision::Pass).unwrap();

    assert_eq!(db.liked_by(a).unwrap(), vec![b]);
}
