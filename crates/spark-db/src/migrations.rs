use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            last_active TEXT
        );

        -- One decision per (actor, target); the PK is the atomicity guard
        -- against double-recording from retried requests.
        CREATE TABLE IF NOT EXISTS swipes (
            actor_id    TEXT NOT NULL REFERENCES users(id),
            target_id   TEXT NOT NULL REFERENCES users(id),
            decision    TEXT NOT NULL CHECK (decision IN ('like', 'pass')),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (actor_id, target_id)
        );

        CREATE INDEX IF NOT EXISTS idx_swipes_target
            ON swipes(target_id, decision);

        -- Pair is normalized (user_a < user_b); the UNIQUE index is what makes
        -- two concurrent mutual-like inserts collapse to a single match.
        CREATE TABLE IF NOT EXISTS matches (
            id              TEXT PRIMARY KEY,
            user_a          TEXT NOT NULL REFERENCES users(id),
            user_b          TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            last_message_at TEXT,
            UNIQUE (user_a, user_b),
            CHECK (user_a < user_b)
        );

        CREATE INDEX IF NOT EXISTS idx_matches_user_a ON matches(user_a);
        CREATE INDEX IF NOT EXISTS idx_matches_user_b ON matches(user_b);

        -- No FK to matches: an unmatch hard-deletes the match row while the
        -- message history stays behind, unreachable without a live match.
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            match_id    TEXT NOT NULL,
            sender_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'sent'
                        CHECK (status IN ('sent', 'delivered', 'read')),
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_match
            ON messages(match_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
