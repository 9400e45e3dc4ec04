use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Decision, Match};

// -- JWT Claims --

/// JWT claims shared between spark-api (REST middleware) and spark-gateway
/// (WebSocket connect-time validation). Canonical definition lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Swipes --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecordSwipeRequest {
    pub target_id: Uuid,
    pub decision: Decision,
}

/// Result of a swipe. `duplicate` is the soft no-op case: the caller had
/// already decided on this target and nothing was recorded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSwipeResponse {
    pub success: bool,
    pub duplicate: bool,
    pub is_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#match: Option<Match>,
}

#[derive(Debug, Serialize)]
pub struct UndoSwipeResponse {
    pub success: bool,
    pub removed: bool,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub count: u64,
}
