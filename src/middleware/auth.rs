use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{decode_session_token, Identity};
use crate::error::ApiError;

const SESSION_COOKIE: &str = "sb-access-token";

/// Session middleware: resolves the caller's identity from a bearer token or
/// the session cookie and injects it into the request.
///
/// "No session", "malformed token" and "expired token" are all the same
/// unauthenticated state.
pub async fn session_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_session_token(&headers)
        .map_err(|msg| ApiError::unauthorized(msg).into_response())?;

    let claims = decode_session_token(&token)
        .map_err(|e| ApiError::unauthorized(e.to_string()).into_response())?;

    request.extensions_mut().insert(Identity::from(claims));

    Ok(next.run(request).await)
}

/// Extract the session token from the Authorization header, falling back to
/// the session cookie.
fn extract_session_token(headers: &HeaderMap) -> Result<String, String> {
    if let Some(auth_header) = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
    {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| "Invalid Authorization header format".to_string())?;

        return if let Some(token) = auth_str.strip_prefix("Bearer ") {
            if token.trim().is_empty() {
                Err("Empty session token".to_string())
            } else {
                Ok(token.to_string())
            }
        } else {
            Err("Authorization header must use Bearer token format".to_string())
        };
    }

    cookie_token(headers).ok_or_else(|| "Missing session".to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;

    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));

        assert_eq!(extract_session_token(&headers).unwrap(), "abc123");
    }

    #[test]
    fn empty_bearer_token_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer "));

        assert!(extract_session_token(&headers).is_err());
    }

    #[test]
    fn cookie_session_is_accepted_without_a_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; sb-access-token=tok456; lang=pt"),
        );

        assert_eq!(extract_session_token(&headers).unwrap(), "tok456");
    }

    #[test]
    fn missing_session_is_rejected() {
        let headers = HeaderMap::new();

        assert!(extract_session_token(&headers).is_err());
    }
}
