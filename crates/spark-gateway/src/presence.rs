//! Presence fan-out. On an online/offline transition the event goes to the
//! user's matched counterparts only — fan-out is O(matches), not a global
//! broadcast. The durable `last_active` write runs on a detached task so the
//! broadcast path never waits on the database.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use spark_db::Database;
use spark_types::events::GatewayEvent;

use crate::registry::Registry;

pub async fn broadcast_transition(
    registry: &Registry,
    db: &Arc<Database>,
    user_id: Uuid,
    is_online: bool,
) {
    let partners = {
        let db = db.clone();
        tokio::task::spawn_blocking(move || db.match_partners(user_id)).await
    };

    let partners = match partners {
        Ok(Ok(partners)) => partners,
        Ok(Err(e)) => {
            warn!("presence fan-out: partner lookup for {user_id} failed: {e}");
            return;
        }
        Err(e) => {
            warn!("presence fan-out: join error: {e}");
            return;
        }
    };

    for partner in partners {
        registry
            .send_to_user(partner, GatewayEvent::Presence { user_id, is_online })
            .await;
    }
}

/// Record activity without blocking the caller. Failures are logged only.
pub fn touch_last_active(db: &Arc<Database>, user_id: Uuid) {
    let db = db.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = db.touch_last_active(&user_id.to_string()) {
            warn!("last_active update for {user_id} failed: {e}");
        }
    });
}
