//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions, plus the
//! one-shot notice shown on the page after a redirect.

use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::{SESSION_COOKIE_AGE_SECONDS, SecurityPolicy};
use crate::models::session_keys;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "enf_session";

/// Create the session layer with `PostgreSQL` store.
///
/// Expiry is measured from the last request, so every request extends the
/// session by the full cookie age.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    policy: &SecurityPolicy,
) -> SessionManagerLayer<PostgresStore> {
    // The sessions table is created by migration
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_COOKIE_AGE_SECONDS),
        ))
        .with_secure(policy.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Queue a notice for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_flash(
    session: &Session,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::FLASH, message.into()).await
}

/// Take the queued notice, if any.
///
/// A session read failure is treated as no notice.
pub async fn take_flash(session: &Session) -> Option<String> {
    session
        .remove::<String>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}
