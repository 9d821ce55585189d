//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use super::Page;
use super::catalog::ProductCardView;
use crate::db::CatalogRepository;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Number of products shown on the home page.
const LATEST_PRODUCTS: i64 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub products: Vec<ProductCardView>,
}

/// Display the home page with the newest products.
#[instrument(skip(state, session, user))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let products = CatalogRepository::new(state.pool())
        .list_products(None, LATEST_PRODUCTS)
        .await?;

    Ok(HomeTemplate {
        page: Page::load(&session, user.as_ref()).await,
        products: products.iter().map(ProductCardView::from).collect(),
    })
}
