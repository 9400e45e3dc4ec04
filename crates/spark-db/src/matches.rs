//! Read-side of the match store: lookups by id and per-user projections.

use rusqlite::Connection;
use spark_types::models::Match;
use uuid::Uuid;

use crate::models::MatchRow;
use crate::{Database, StoreError};

impl Database {
    pub fn get_match(&self, match_id: Uuid) -> Result<Option<Match>, StoreError> {
        self.with_conn(|conn| {
            let row = query_match_by_id(conn, &match_id.to_string())?;
            row.map(MatchRow::into_match).transpose()
        })
    }

    /// Like `get_match` but requires `user_id` to be a participant, which is
    /// the access check every chat operation goes through. A missing match and
    /// a match the caller does not belong to are distinct failures so the API
    /// layer can log the latter as an integrity violation.
    pub fn get_match_for_participant(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> Result<Match, StoreError> {
        let m = self.get_match(match_id)?.ok_or(StoreError::NotFound)?;
        if !m.is_participant(user_id) {
            return Err(StoreError::NotParticipant);
        }
        Ok(m)
    }

    /// All matches the user participates in, newest activity first.
    pub fn matches_for_user(&self, user_id: Uuid) -> Result<Vec<Match>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_a, user_b, created_at, last_message_at
                 FROM matches
                 WHERE user_a = ?1 OR user_b = ?1
                 ORDER BY COALESCE(last_message_at, created_at) DESC",
            )?;
            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok(MatchRow {
                        id: row.get(0)?,
                        user_a: row.get(1)?,
                        user_b: row.get(2)?,
                        created_at: row.get(3)?,
                        last_message_at: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(MatchRow::into_match).collect()
        })
    }

    /// Counterpart user ids across all of the user's matches. This is the
    /// presence fan-out set: O(matches), never O(all users).
    pub fn match_partners(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let matches = self.matches_for_user(user_id)?;
        Ok(matches
            .iter()
            .filter_map(|m| m.other_participant(user_id))
            .collect())
    }
}

fn query_match_by_id(conn: &Connection, id: &str) -> Result<Option<MatchRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_a, user_b, created_at, last_message_at
         FROM matches WHERE id = ?1",
    )?;
    let row = stmt
        .query_row([id], |row| {
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
            other => Err(StoreError::from(other)),
        })?;
    Ok(row)
}
