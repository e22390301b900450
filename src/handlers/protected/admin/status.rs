use axum::Extension;
use serde_json::{json, Value};

use crate::auth::Identity;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::AdminDecision;

/// GET /api/admin/status - the decision the guard made for this request
pub async fn status_get(
    Extension(identity): Extension<Identity>,
    Extension(decision): Extension<AdminDecision>,
) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "user": {
            "id": identity.id,
            "email": identity.email,
        },
        "admin": decision,
    })))
}
