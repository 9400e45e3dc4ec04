//! Typing indicator relay. Nothing is persisted and nothing is retried: a
//! missed indicator is acceptable, a client clears stale ones on its own.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use spark_db::{Database, StoreError};
use spark_types::events::GatewayEvent;

use crate::registry::Registry;

pub async fn relay(
    registry: &Registry,
    db: &Arc<Database>,
    user_id: Uuid,
    match_id: Uuid,
    is_typing: bool,
) {
    let resolved = {
        let db = db.clone();
        tokio::task::spawn_blocking(move || db.get_match_for_participant(match_id, user_id)).await
    };

    let m = match resolved {
        Ok(Ok(m)) => m,
        Ok(Err(StoreError::NotParticipant)) => {
            // Typing signal for a match the sender does not belong to is a
            // potential integrity violation, not a client-visible error.
            warn!("typing relay: {user_id} is not a participant of match {match_id}");
            return;
        }
        Ok(Err(StoreError::NotFound)) => return,
        Ok(Err(e)) => {
            warn!("typing relay: match lookup failed: {e}");
            return;
        }
        Err(e) => {
            warn!("typing relay: join error: {e}");
            return;
        }
    };

    let Some(counterpart) = m.other_participant(user_id) else {
        return;
    };

    registry
        .send_to_user(
            counterpart,
            GatewayEvent::Typing {
                match_id,
                user_id,
                is_typing,
            },
        )
        .await;
}
