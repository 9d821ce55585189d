//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads;
//! plain form posts get a redirect back to the cart page instead.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use enf_core::{CartItemId, Price, PriceError, ProductId, ProductSizeId};

use super::{Page, media_url};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::{CurrentCart, OptionalAuth, set_flash};
use crate::models::CartContents;
use crate::services::CartService;
use crate::state::AppState;

/// Notice shown when an update or removal targets a line that is gone.
const MISSING_LINE_NOTICE: &str = "That item is no longer in your cart.";

/// Shown instead of an amount too large to be charged.
const OVER_LIMIT: &str = "over limit";

pub(super) fn money(amount: core::result::Result<Price, PriceError>) -> String {
    amount.map_or_else(|_| OVER_LIMIT.to_owned(), |price| price.to_string())
}

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub size: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image: Option<String>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u64,
    /// The total cannot be charged in one order.
    pub over_limit: bool,
}

impl From<&CartContents> for CartView {
    fn from(contents: &CartContents) -> Self {
        let subtotal = contents.subtotal();
        Self {
            items: contents
                .items
                .iter()
                .map(|item| CartItemView {
                    id: item.line.id.map_or(0, |id| id.as_i64()),
                    slug: item.product_slug.clone(),
                    name: item.product_name.clone(),
                    size: item.size_name.clone(),
                    quantity: item.line.quantity,
                    price: item.line.unit_price.to_string(),
                    line_price: money(item.line.total_price()),
                    image: item.main_image.as_deref().map(media_url),
                })
                .collect(),
            over_limit: subtotal.is_err(),
            subtotal: money(subtotal),
            item_count: contents.total_items(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i64,
    pub size_id: i64,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: i64,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: i64,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: Page,
    pub cart: CartView,
    pub notice: Option<String>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub notice: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u64,
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Respond to a cart change: the items fragment for HTMX, else a redirect.
async fn after_change(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    cart: &CurrentCart,
    notice: Option<&str>,
) -> Result<Response> {
    if !is_htmx(headers) {
        if let Some(notice) = notice
            && let Err(e) = set_flash(session, notice).await
        {
            tracing::warn!("Failed to queue cart notice: {e}");
        }
        return Ok(Redirect::to("/cart").into_response());
    }

    let contents = CartService::new(state.pool()).contents(cart.key()).await?;
    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(&contents),
            notice: notice.map(str::to_owned),
        },
    )
        .into_response())
}

/// Display cart page.
#[instrument(skip(state, session, user, cart))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    cart: CurrentCart,
) -> Result<impl IntoResponse> {
    let contents = CartService::new(state.pool()).contents(cart.key()).await?;

    Ok(CartShowTemplate {
        page: Page::load(&session, user.as_ref()).await,
        cart: CartView::from(&contents),
        notice: None,
    })
}

/// Add item to cart.
///
/// Adding a product/size already in the cart increases that line's quantity.
/// HTMX requests get the updated count badge and a `cart-updated` trigger.
#[instrument(skip(state, session, headers, cart))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    cart: CurrentCart,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let service = CartService::new(state.pool());
    service
        .add_product(
            cart.key(),
            ProductId::new(form.product_id),
            ProductSizeId::new(form.size_id),
            form.quantity.unwrap_or(1),
        )
        .await?;

    let product_id = form.product_id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));

    if !is_htmx(&headers) {
        if let Err(e) = set_flash(&session, "Added to cart.").await {
            tracing::warn!("Failed to queue cart notice: {e}");
        }
        return Ok(Redirect::to("/cart").into_response());
    }

    let count = service.total_items(cart.key()).await?;
    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartCountTemplate { count },
    )
        .into_response())
}

/// Update cart item quantity; zero or less removes the line.
#[instrument(skip(state, session, headers, cart))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    cart: CurrentCart,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let found = CartService::new(state.pool())
        .update_item_quantity(cart.key(), CartItemId::new(form.item_id), form.quantity)
        .await?;

    let notice = (!found).then_some(MISSING_LINE_NOTICE);
    after_change(&state, &session, &headers, &cart, notice).await
}

/// Remove item from cart.
#[instrument(skip(state, session, headers, cart))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    cart: CurrentCart,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let found = CartService::new(state.pool())
        .remove_item(cart.key(), CartItemId::new(form.item_id))
        .await?;

    let notice = (!found).then_some(MISSING_LINE_NOTICE);
    after_change(&state, &session, &headers, &cart, notice).await
}

/// Remove every item from the cart.
#[instrument(skip(state, session, headers, cart))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    cart: CurrentCart,
) -> Result<Response> {
    CartService::new(state.pool()).clear(cart.key()).await?;
    after_change(&state, &session, &headers, &cart, None).await
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, cart))]
pub async fn count(State(state): State<AppState>, cart: CurrentCart) -> Result<impl IntoResponse> {
    let count = CartService::new(state.pool()).total_items(cart.key()).await?;
    Ok(CartCountTemplate { count })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use enf_core::CartId;
    use enf_core::cart::{CartLine, LineKey};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::CartItemDetail;

    fn detail(id: i64, price: Price, quantity: u32) -> CartItemDetail {
        CartItemDetail {
            line: CartLine {
                id: Some(CartItemId::new(id)),
                key: LineKey::new(ProductId::new(id), ProductSizeId::new(id)),
                quantity,
                unit_price: price,
            },
            product_name: format!("Product {id}"),
            product_slug: format!("product-{id}"),
            size_name: "M".to_owned(),
            main_image: Some("products/p.jpg".to_owned()),
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let contents = CartContents {
            id: Some(CartId::new(1)),
            items: vec![
                detail(1, Price::new(dec!(10.50)).unwrap(), 2),
                detail(2, Price::new(dec!(3)).unwrap(), 1),
            ],
        };

        let view = CartView::from(&contents);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, "24.00");
        assert_eq!(view.items[0].line_price, "21.00");
        assert_eq!(view.items[0].image.as_deref(), Some("/media/products/p.jpg"));
    }

    #[test]
    fn test_cart_view_flags_uncharged_total() {
        let contents = CartContents {
            id: Some(CartId::new(1)),
            items: vec![
                detail(1, Price::new(dec!(5000.00)).unwrap(), 30_000),
                detail(2, Price::new(dec!(3)).unwrap(), 1),
            ],
        };

        let view = CartView::from(&contents);
        assert!(view.over_limit);
        assert_eq!(view.subtotal, OVER_LIMIT);
        assert_eq!(view.items[0].line_price, OVER_LIMIT);
        assert_eq!(view.items[1].line_price, "3.00");
        assert_eq!(view.item_count, 30_001);
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::from(&CartContents::default());
        assert!(view.items.is_empty());
        assert_eq!(view.subtotal, "0.00");
        assert_eq!(view.item_count, 0);
        assert!(!view.over_limit);
    }
}
