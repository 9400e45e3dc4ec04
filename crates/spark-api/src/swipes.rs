use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::{debug, info};
use uuid::Uuid;

use spark_db::swipes::SwipeOutcome;
use spark_types::api::{Claims, RecordSwipeRequest, RecordSwipeResponse, UndoSwipeResponse};
use spark_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::state::AppState;

/// Record a like/pass on a target profile. A repeat decision on the same
/// target is a soft no-op (`duplicate: true`), since UI retries are expected.
/// A completed mutual like comes back with the match, and both sides' live
/// connections are notified.
pub async fn record_swipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RecordSwipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor_id = claims.sub;
    let target_id = req.target_id;
    if target_id == actor_id {
        return Err(ApiError::Invalid("cannot swipe on yourself".into()));
    }

    let db = state.db.clone();
    let decision = req.decision;
    let outcome =
        tokio::task::spawn_blocking(move || db.record_swipe(actor_id, target_id, decision))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {e}")))??;

    let response = match outcome {
        SwipeOutcome::Duplicate => {
            debug!("{actor_id} repeated swipe on {target_id}");
            RecordSwipeResponse {
                success: false,
                duplicate: true,
                is_match: false,
                r#match: None,
            }
        }
        SwipeOutcome::Recorded { matched: None } => RecordSwipeResponse {
            success: true,
            duplicate: false,
            is_match: false,
            r#match: None,
        },
        SwipeOutcome::Recorded { matched: Some(m) } => {
            info!("match {} created for {} and {}", m.id, m.user_a, m.user_b);
            for participant in [m.user_a, m.user_b] {
                state
                    .registry
                    .send_to_user(participant, GatewayEvent::Match { r#match: m.clone() })
                    .await;
            }
            RecordSwipeResponse {
                success: true,
                duplicate: false,
                is_match: true,
                r#match: Some(m),
            }
        }
    };

    Ok(Json(response))
}

/// Undo the caller's own decision on a target ("rewind"). Idempotent. When
/// the undo tears down a match, both sides learn about it immediately.
pub async fn undo_swipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(target_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor_id = claims.sub;

    let db = state.db.clone();
    let outcome = tokio::task::spawn_blocking(move || db.undo_swipe(actor_id, target_id))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {e}")))??;

    if let Some(unmatched) = &outcome.unmatched {
        info!("match {} torn down by {actor_id}", unmatched.id);
        for participant in [unmatched.user_a, unmatched.user_b] {
            state
                .registry
                .send_to_user(participant, GatewayEvent::Unmatch { match_id: unmatched.id })
                .await;
        }
    }

    Ok(Json(UndoSwipeResponse {
        success: true,
        removed: outcome.removed,
    }))
}

/// Matches the caller participates in, most recent activity first.
pub async fn get_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let db = state.db.clone();
    let matches = tokio::task::spawn_blocking(move || db.matches_for_user(user_id))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {e}")))??;
    Ok(Json(matches))
}

/// Profiles that liked the caller and are still waiting on a decision.
pub async fn get_liked_by(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let db = state.db.clone();
    let ids = tokio::task::spawn_blocking(move || db.liked_by(user_id))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {e}")))??;
    Ok(Json(ids))
}
