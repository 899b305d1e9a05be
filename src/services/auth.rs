//! Credential flows on top of the token signer and the user repository.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::token::{Claims, TokenSigner};
use crate::db::Store;
use crate::entities::users;
use crate::error::Result;

#[must_use]
pub fn login_claims(name: &str, password: &str) -> Claims {
    let mut claims = Claims::new();
    claims.insert("name".to_string(), Value::from(name));
    claims.insert("password".to_string(), Value::from(password));
    claims
}

#[must_use]
pub fn invite_claims(creator: &users::Model, created_at: DateTime<Utc>) -> Claims {
    let mut claims = Claims::new();
    // Microseconds, so back-to-back invites never collide on the unique
    // token column.
    claims.insert(
        "created_at".to_string(),
        created_at.timestamp_micros().into(),
    );
    claims.insert("created_by".to_string(), Value::from(creator.name.as_str()));
    claims
}

/// Check credentials and mint a fresh session token for them.
pub async fn login(
    store: &Store,
    signer: &TokenSigner,
    name: &str,
    password: &str,
) -> Result<(users::Model, String)> {
    let user = store.authenticate_user(name, password).await?;
    let token = signer.issue(&login_claims(name, password))?;
    Ok((user, token))
}

/// Resolve a presented token to its user. Every failure mode — missing
/// claims, bad signature, a password that no longer validates — degrades to
/// anonymous; this never surfaces an error to the request.
pub async fn resolve_user(
    store: &Store,
    signer: &TokenSigner,
    token: &str,
) -> Option<users::Model> {
    let claims = signer.verify(token).ok()?;
    let name = claims.get("name")?.as_str()?;
    let password = claims.get("password")?.as_str()?;
    store.authenticate_user(name, password).await.ok()
}
