//! Database row types — these map directly to SQLite rows.
//! Distinct from spark-types API models to keep the DB layer independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use spark_types::models::{DeliveryStatus, Match, Message};
use uuid::Uuid;

use crate::StoreError;

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct MatchRow {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub created_at: String,
    pub last_message_at: Option<String>,
}

pub struct MessageRow {
    pub id: String,
    pub match_id: String,
    pub sender_id: String,
    pub content: String,
    pub status: String,
    pub created_at: String,
}

/// SQLite stores timestamps either as RFC 3339 or as
/// "YYYY-MM-DD HH:MM:SS" without timezone, depending on how the column
/// default was written. Accept both, treating naive values as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| StoreError::Internal(format!("corrupt timestamp '{raw}': {e}")))
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    raw.parse()
        .map_err(|e| StoreError::Internal(format!("corrupt uuid '{raw}': {e}")))
}

impl MatchRow {
    pub fn into_match(self) -> Result<Match, StoreError> {
        Ok(Match {
            id: parse_uuid(&self.id)?,
            user_a: parse_uuid(&self.user_a)?,
            user_b: parse_uuid(&self.user_b)?,
            created_at: parse_timestamp(&self.created_at)?,
            last_message_at: self
                .last_message_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message, StoreError> {
        let status: DeliveryStatus = self
            .status
            .parse()
            .map_err(StoreError::Internal)?;
        Ok(Message {
            id: parse_uuid(&self.id)?,
            match_id: parse_uuid(&self.match_id)?,
            sender_id: parse_uuid(&self.sender_id)?,
            content: self.content,
            status,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
