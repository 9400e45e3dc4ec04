//! Swipe decisions and mutual-like match detection.
//!
//! Recording a like and detecting the reciprocal like happen inside one
//! transaction, so a match can never be observed without both swipes and the
//! "check then insert" pattern has no window for double-creation. The
//! normalized-pair UNIQUE index on `matches` covers the cross-process race:
//! the loser of a simultaneous mutual like re-reads the winner's row.

use rusqlite::{Transaction, params};
use spark_types::models::{Decision, Match};
use uuid::Uuid;

use crate::models::MatchRow;
use crate::{Database, StoreError};

/// Result of recording a swipe.
#[derive(Debug)]
pub enum SwipeOutcome {
    /// The decision was persisted. `matched` carries the match when this like
    /// completed a mutual pair (whether this insert created it or a
    /// concurrent reciprocal insert won and we adopted its row).
    Recorded { matched: Option<Match> },
    /// A decision for this (actor, target) already exists; nothing changed.
    Duplicate,
}

/// Result of undoing a swipe.
#[derive(Debug)]
pub struct UndoOutcome {
    pub removed: bool,
    /// The match torn down by this undo, if one existed for the pair.
    pub unmatched: Option<Match>,
}

/// Normalize an unordered pair to (lo, hi) by UUID text so both sides of a
/// mutual like address the same match row.
pub fn normalized_pair(a: Uuid, b: Uuid) -> (String, String) {
    let (a, b) = (a.to_string(), b.to_string());
    if a < b { (a, b) } else { (b, a) }
}

fn is_pk_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl Database {
    /// Record a swipe decision. At most one decision per (actor, target); a
    /// retry or double-tap lands on the PK and reports `Duplicate` instead of
    /// failing. When the decision is a like and the reciprocal like exists,
    /// the match is created (or adopted) in the same transaction.
    pub fn record_swipe(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        decision: Decision,
    ) -> Result<SwipeOutcome, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT INTO swipes (actor_id, target_id, decision) VALUES (?1, ?2, ?3)",
                params![actor_id.to_string(), target_id.to_string(), decision.as_str()],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_pk_violation(&e) => return Ok(SwipeOutcome::Duplicate),
                Err(e) => return Err(e.into()),
            }

            let matched = if decision == Decision::Like {
                let reciprocal: bool = tx.query_row(
                    "SELECT EXISTS(
                        SELECT 1 FROM swipes
                        WHERE actor_id = ?1 AND target_id = ?2 AND decision = 'like'
                    )",
                    params![target_id.to_string(), actor_id.to_string()],
                    |row| row.get(0),
                )?;
                if reciprocal {
                    Some(insert_or_adopt_match(&tx, actor_id, target_id)?)
                } else {
                    None
                }
            } else {
                None
            };

            tx.commit()?;
            Ok(SwipeOutcome::Recorded { matched })
        })
    }

    /// Undo the actor's own decision about `target_id`. Idempotent: a missing
    /// swipe reports `removed: false`. When a match existed for the pair it is
    /// hard-deleted in the same transaction; messages stay behind but become
    /// unreachable without the match row.
    pub fn undo_swipe(&self, actor_id: Uuid, target_id: Uuid) -> Result<UndoOutcome, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let removed = tx.execute(
                "DELETE FROM swipes WHERE actor_id = ?1 AND target_id = ?2",
                params![actor_id.to_string(), target_id.to_string()],
            )? > 0;

            let mut unmatched = None;
            if removed {
                let (lo, hi) = normalized_pair(actor_id, target_id);
                if let Some(row) = query_match_by_pair(&tx, &lo, &hi)? {
                    tx.execute("DELETE FROM matches WHERE id = ?1", [&row.id])?;
                    unmatched = Some(row.into_match()?);
                }
            }

            tx.commit()?;
            Ok(UndoOutcome { removed, unmatched })
        })
    }

    /// Profiles that have liked `user_id` and not been swiped back on yet.
    pub fn liked_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.actor_id FROM swipes s
                 WHERE s.target_id = ?1 AND s.decision = 'like'
                   AND NOT EXISTS (
                       SELECT 1 FROM swipes back
                       WHERE back.actor_id = ?1 AND back.target_id = s.actor_id
                   )
                 ORDER BY s.created_at DESC",
            )?;
            let ids = stmt
                .query_map([user_id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids.iter()
                .map(|raw| {
                    raw.parse()
                        .map_err(|e| StoreError::Internal(format!("corrupt uuid '{raw}': {e}")))
                })
                .collect()
        })
    }
}

fn insert_or_adopt_match(
    tx: &Transaction<'_>,
    actor_id: Uuid,
    target_id: Uuid,
) -> Result<Match, StoreError> {
    let (lo, hi) = normalized_pair(actor_id, target_id);
    let match_id = Uuid::new_v4();

    let inserted = tx.execute(
        "INSERT INTO matches (id, user_a, user_b) VALUES (?1, ?2, ?3)",
        params![match_id.to_string(), lo, hi],
    );
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            // Lost the race to the reciprocal insert; adopt the winner's row.
            return query_match_by_pair(tx, &lo, &hi)?
                .ok_or(StoreError::NotFound)?
                .into_match();
        }
        Err(e) => return Err(e.into()),
    }

    query_match_by_pair(tx, &lo, &hi)?
        .ok_or(StoreError::NotFound)?
        .into_match()
}

fn query_match_by_pair(
    tx: &Transaction<'_>,
    lo: &str,
    hi: &str,
) -> Result<Option<MatchRow>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT id, user_a, user_b, created_at, last_message_at
         FROM matches WHERE user_a = ?1 AND user_b = ?2",
    )?;
    let row = stmt
        .query_row([lo, hi], |row| {
            Ok(MatchRow {
                id: row.get(0)?,
                user_a: row.get(1)?,
                user_b: row.get(2)?,
                created_at: row.get(3)?,
                last_message_at: row.get(4)?,
            })
        })
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    Ok(row)
}
