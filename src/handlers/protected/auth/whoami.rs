use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::auth::Identity;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/auth/whoami - current identity plus a fresh admin decision
///
/// Informational for any authenticated caller; non-admins get a 200 with
/// `is_admin: false` rather than a 403.
pub async fn whoami_get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Value> {
    let decision = state.admin.verify_admin_status(&identity).await;

    Ok(ApiResponse::success(json!({
        "user": {
            "id": identity.id,
            "email": identity.email,
        },
        "admin": decision,
    })))
}
