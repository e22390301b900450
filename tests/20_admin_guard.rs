mod common;

use anyhow::Result;
use reqwest::StatusCode;

const ADMIN_SUB: &str = "8b1e9d2c-5f47-4a21-9c1d-3e7a0b6f4d58";
const VISITOR_SUB: &str = "2a9c4e81-7d35-4b6f-8e02-5c1d9f3a7b64";

#[tokio::test]
async fn whoami_requires_a_session() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/auth/whoami", server.base_url);

    let res = client.get(&url).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(&url)
        .header("Authorization", "Bearer not-a-token")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn allowlist_admin_is_verified_by_email_with_the_database_down() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::mint_token(ADMIN_SUB, common::ALLOWLIST_EMAIL);

    // The spawned server points at a dead database on purpose: the decision
    // must still come from the allowlist path.
    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["admin"]["is_admin"], true);
    assert_eq!(body["data"]["admin"]["method"], "email");

    // And the admin guard lets the same identity through
    let res = client
        .get(format!("{}/api/admin/status", server.base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["admin"]["method"], "email");

    Ok(())
}

#[tokio::test]
async fn non_admin_is_denied_while_the_database_is_down() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::mint_token(VISITOR_SUB, "test@example.com");

    // whoami stays informational for any valid session
    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["admin"]["is_admin"], false);
    assert_eq!(body["data"]["admin"]["method"], "fallback");
    assert!(body["data"]["admin"]["error"].is_string());

    // but the guard refuses
    let res = client
        .get(format!("{}/api/admin/status", server.base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "FORBIDDEN");

    Ok(())
}

#[tokio::test]
async fn cookie_session_is_accepted() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::mint_token(ADMIN_SUB, common::ALLOWLIST_EMAIL);

    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .header("Cookie", format!("sb-access-token={}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["user"]["id"], ADMIN_SUB);

    Ok(())
}
