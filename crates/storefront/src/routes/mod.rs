//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (latest products)
//!
//! # Catalog
//! GET  /catalog                - Product listing (?category=slug)
//! GET  /catalog/{slug}         - Product detail with sizes and images
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns count badge, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove item (returns cart_items fragment)
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (requires auth)
//! GET  /checkout               - Order form prefilled from the profile
//! POST /checkout               - Place order
//! GET  /orders/{id}            - Order confirmation (owner only)
//!
//! # Account
//! GET  /account                - Profile and order history (requires auth)
//! POST /account                - Update profile (requires auth)
//! GET  /account/login          - Login page
//! POST /account/login          - Login action
//! GET  /account/register       - Register page
//! POST /account/register       - Register action
//! POST /account/logout         - Logout action
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod home;

use axum::{
    Router,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::{auth_rate_limiter, cart_rate_limiter, take_flash};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Data every full page needs for the shared layout.
#[derive(Clone, Default)]
pub struct Page {
    /// First name of the logged-in user.
    pub user_name: Option<String>,
    /// One-shot notice queued by the previous request.
    pub flash: Option<String>,
}

impl Page {
    /// Build the layout data, consuming any queued notice.
    pub async fn load(session: &Session, user: Option<&CurrentUser>) -> Self {
        Self {
            user_name: user.map(|u| u.first_name.clone()),
            flash: take_flash(session).await,
        }
    }
}

/// URL for a file stored under the media root.
#[must_use]
pub fn media_url(path: &str) -> String {
    format!("/media/{}", path.trim_start_matches('/'))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/{slug}", get(catalog::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .layer(cart_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .merge(mutations)
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/", get(account::index).post(account::update))
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(credentials)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/catalog", catalog_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place_order))
        .route("/orders/{id}", get(checkout::order_detail))
        .nest("/account", account_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_url() {
        assert_eq!(media_url("products/a.jpg"), "/media/products/a.jpg");
        assert_eq!(media_url("/products/a.jpg"), "/media/products/a.jpg");
    }
}
