use axum::{extract::State, Extension};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::{ReconcileAction, Reconciliation};
use crate::state::AppState;

/// POST /api/admin/profile - reconcile the caller's profile row
///
/// Creates the missing row or upgrades a stale role; 201 only when a row
/// was created.
pub async fn profile_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Reconciliation> {
    let outcome = state.admin.ensure_admin_profile(&identity).await?;

    // the guard already granted admin; a None here means the decision
    // flipped mid-request
    let outcome =
        outcome.ok_or_else(|| ApiError::forbidden("Administrator access required"))?;

    Ok(match outcome.action {
        ReconcileAction::Created => ApiResponse::created(outcome),
        _ => ApiResponse::success(outcome),
    })
}
