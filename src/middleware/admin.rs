use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;

/// Reusable admin guard.
///
/// Every admin route goes through this single check instead of re-deriving
/// allowlist/role logic per handler. The decision is injected into the
/// request so handlers can report which strategy granted access.
pub async fn require_admin_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| {
            ApiError::unauthorized("Session required before admin check").into_response()
        })?;

    let decision = state.admin.verify_admin_status(&identity).await;

    if !decision.is_admin {
        tracing::warn!(
            "admin access denied for {} ({}): method={}, error={:?}",
            identity.id,
            identity.email,
            decision.method.as_str(),
            decision.error
        );
        let message = decision
            .error
            .clone()
            .unwrap_or_else(|| "Administrator access required".to_string());
        return Err(ApiError::forbidden(message).into_response());
    }

    tracing::debug!(
        "admin access granted for {} via {}",
        identity.id,
        decision.method.as_str()
    );

    request.extensions_mut().insert(decision);

    Ok(next.run(request).await)
}
