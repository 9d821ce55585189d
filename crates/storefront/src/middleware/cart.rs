//! Session cart extractor.
//!
//! Every session that touches the cart gets a random cart key stored in the
//! session. Carts are looked up by that key, so a cart survives the session
//! id being cycled at login and is dropped together with the session data.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::session_keys;

/// The cart handle for this request's session.
///
/// Extracting it ensures the session has a cart key. The cart row itself is
/// created on first add; reads of a session without one see an empty cart.
///
/// # Example
///
/// ```rust,ignore
/// async fn cart_page(State(state): State<AppState>, cart: CurrentCart) -> Result<impl IntoResponse> {
///     let contents = CartService::new(state.pool()).contents(cart.key()).await?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentCart {
    key: String,
}

impl CurrentCart {
    /// The key the cart is stored under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolve the cart key from a session, generating one if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn from_session(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        if let Some(key) = session.get::<String>(session_keys::CART_KEY).await? {
            return Ok(Self { key });
        }

        let key = new_cart_key();
        session.insert(session_keys::CART_KEY, &key).await?;
        Ok(Self { key })
    }
}

fn new_cart_key() -> String {
    Uuid::new_v4().simple().to_string()
}

impl<S> FromRequestParts<S> for CurrentCart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;

        Self::from_session(session)
            .await
            .map_err(|e| AppError::Internal(format!("session error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_keys_are_unique_and_compact() {
        let a = new_cart_key();
        let b = new_cart_key();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
