//! Durable half of message dispatch: persistence, paging, and the monotonic
//! sent -> delivered -> read status machine. Every UPDATE here is guarded by
//! the current status, so retried or out-of-order calls are no-ops rather
//! than downgrades.

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};
use spark_types::models::{DeliveryStatus, Match, Message};
use uuid::Uuid;

use crate::models::MessageRow;
use crate::{Database, StoreError};

impl Database {
    /// Persist a message with status `sent` and bump the match's
    /// last_message_at, atomically. The participant check runs inside the
    /// transaction so a concurrent unmatch cannot leave a message attached to
    /// a match that no longer exists.
    pub fn insert_message(
        &self,
        match_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let m = query_match(&tx, match_id)?.ok_or(StoreError::NotFound)?;
            if !m.is_participant(sender_id) {
                return Err(StoreError::NotParticipant);
            }

            let id = Uuid::new_v4();
            let created_at = Utc::now();
            let ts = created_at.to_rfc3339_opts(SecondsFormat::Millis, true);
            tx.execute(
                "INSERT INTO messages (id, match_id, sender_id, content, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'sent', ?5)",
                params![
                    id.to_string(),
                    match_id.to_string(),
                    sender_id.to_string(),
                    content,
                    ts
                ],
            )?;
            tx.execute(
                "UPDATE matches SET last_message_at = ?1 WHERE id = ?2",
                params![ts, match_id.to_string()],
            )?;

            tx.commit()?;
            Ok(Message {
                id,
                match_id,
                sender_id,
                content: content.to_string(),
                status: DeliveryStatus::Sent,
                created_at,
            })
        })
    }

    /// Optimistic upgrade after a successful live push. Guarded by the
    /// current status: a message already read stays read.
    pub fn mark_delivered(&self, message_id: Uuid) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET status = 'delivered' WHERE id = ?1 AND status = 'sent'",
                [message_id.to_string()],
            )?;
            Ok(())
        })
    }

    /// Page of messages for a participant, oldest-first within the page.
    /// Pass the id of the oldest message from the previous page as `before`
    /// to walk backwards; the cursor compares (created_at, rowid) so rows
    /// sharing a timestamp are never skipped. An unknown cursor id falls back
    /// to the newest page. Fetching counts as receipt: the counterpart's
    /// still-`sent` messages move to `delivered`.
    pub fn get_messages(
        &self,
        match_id: Uuid,
        viewer_id: Uuid,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<Message>, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let m = query_match(&tx, match_id)?.ok_or(StoreError::NotFound)?;
            if !m.is_participant(viewer_id) {
                return Err(StoreError::NotParticipant);
            }

            tx.execute(
                "UPDATE messages SET status = 'delivered'
                 WHERE match_id = ?1 AND sender_id != ?2 AND status = 'sent'",
                params![match_id.to_string(), viewer_id.to_string()],
            )?;

            let cursor: Option<(String, i64)> = match before {
                Some(id) => tx
                    .query_row(
                        "SELECT created_at, rowid FROM messages
                         WHERE id = ?1 AND match_id = ?2",
                        params![id, match_id.to_string()],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .map(Some)
                    .or_else(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(StoreError::from(other)),
                    })?,
                None => None,
            };
            let (cursor_ts, cursor_rowid) = match &cursor {
                Some((ts, rowid)) => (Some(ts.as_str()), Some(*rowid)),
                None => (None, None),
            };

            let mut rows = {
                let mut stmt = tx.prepare(
                    "SELECT id, match_id, sender_id, content, status, created_at
                     FROM messages
                     WHERE match_id = ?1
                       AND (?2 IS NULL OR (created_at, rowid) < (?2, ?3))
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?4",
                )?;
                stmt.query_map(
                    params![match_id.to_string(), cursor_ts, cursor_rowid, limit],
                    |row| {
                        Ok(MessageRow {
                            id: row.get(0)?,
                            match_id: row.get(1)?,
                            sender_id: row.get(2)?,
                            content: row.get(3)?,
                            status: row.get(4)?,
                            created_at: row.get(5)?,
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?
            };

            tx.commit()?;

            // Page is selected newest-first; the client reads oldest-first.
            rows.reverse();
            rows.into_iter().map(MessageRow::into_message).collect()
        })
    }

    /// Transition all of the counterpart's messages to `read`. Never touches
    /// the reader's own messages, never moves a message backwards. Returns
    /// the number of rows that changed, so an idempotent retry reports 0.
    pub fn mark_read(&self, match_id: Uuid, reader_id: Uuid) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let m = query_match(conn, match_id)?.ok_or(StoreError::NotFound)?;
            if !m.is_participant(reader_id) {
                return Err(StoreError::NotParticipant);
            }

            let count = conn.execute(
                "UPDATE messages SET status = 'read'
                 WHERE match_id = ?1 AND sender_id != ?2 AND status != 'read'",
                params![match_id.to_string(), reader_id.to_string()],
            )?;
            Ok(count as u64)
        })
    }
}

fn query_match(conn: &Connection, match_id: Uuid) -> Result<Option<Match>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_a, user_b, created_at, last_message_at
         FROM matches WHERE id = ?1",
    )?;
    let row = stmt
        .query_row([match_id.to_string()], |row| {
            Ok(crate::models::MatchRow {
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
    row.map(crate::models::MatchRow::into_match).transpose()
}
