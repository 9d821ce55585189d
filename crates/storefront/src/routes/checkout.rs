//! Checkout and order confirmation route handlers.
//!
//! Both require a logged-in user; orders are only shown to their owner.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use enf_core::OrderId;
use enf_core::checkout::{Address, CheckoutError};

use super::Page;
use super::cart::{CartView, money};
use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::forms::{FieldErrors, OrderForm};
use crate::middleware::{CurrentCart, RequireAuth, set_flash};
use crate::models::{CurrentUser, Order, OrderWithItems};
use crate::services::{AccountService, CartService, CheckoutService, CheckoutServiceError};
use crate::state::AppState;

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub slug: String,
    pub size: String,
    pub quantity: u32,
    pub price: String,
    pub total: String,
}

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: i64,
    pub created_at: String,
    pub status: String,
    pub total: String,
    pub full_name: String,
    pub email: String,
    pub address_lines: Vec<String>,
    pub phone: Option<String>,
    pub special_instructions: Option<String>,
    pub payment_provider: Option<String>,
    pub items: Vec<OrderItemView>,
}

/// Non-empty address parts in display order.
fn address_lines(address: &Address) -> Vec<String> {
    let locality = [&address.postal_code, &address.city]
        .into_iter()
        .flatten()
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    let region = [&address.province, &address.country]
        .into_iter()
        .flatten()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    [
        address.company.clone(),
        address.address1.clone(),
        address.address2.clone(),
        Some(locality),
        Some(region),
    ]
    .into_iter()
    .flatten()
    .filter(|line| !line.is_empty())
    .collect()
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        let contact = &order.contact;
        Self {
            id: order.id.as_i64(),
            created_at: order.created_at.format("%d.%m.%Y %H:%M").to_string(),
            status: order.status.label().to_owned(),
            total: order.total_price.to_string(),
            full_name: format!("{} {}", contact.first_name, contact.last_name),
            email: contact.email.to_string(),
            address_lines: address_lines(&contact.address),
            phone: contact.address.phone.clone(),
            special_instructions: contact.special_instructions.clone(),
            payment_provider: order.payment_provider.map(|p| p.label().to_owned()),
            items: Vec::new(),
        }
    }
}

impl From<&OrderWithItems> for OrderView {
    fn from(found: &OrderWithItems) -> Self {
        Self {
            items: found
                .items
                .iter()
                .map(|item| OrderItemView {
                    name: item.product_name.clone(),
                    slug: item.product_slug.clone(),
                    size: item.size_name.clone(),
                    quantity: item.line.quantity,
                    price: item.line.price.to_string(),
                    total: money(item.total_price()),
                })
                .collect(),
            ..Self::from(&found.order)
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutTemplate {
    pub page: Page,
    pub form: OrderForm,
    pub errors: FieldErrors,
    pub cart: CartView,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderTemplate {
    pub page: Page,
    pub order: OrderView,
}

/// Form errors for a cart whose total cannot be charged in one order.
fn total_too_large_errors() -> FieldErrors {
    let mut errors = FieldErrors::default();
    errors.add(
        "cart",
        "Your order total is too large. Please reduce the quantities in your cart.",
    );
    errors
}

async fn redirect_to_empty_cart(session: &Session) -> Response {
    if let Err(e) = set_flash(session, "Your cart is empty.").await {
        tracing::warn!("Failed to queue checkout notice: {e}");
    }
    Redirect::to("/cart").into_response()
}

async fn render_form(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    cart: &CurrentCart,
    form: OrderForm,
    errors: FieldErrors,
) -> Result<Response> {
    let contents = CartService::new(state.pool()).contents(cart.key()).await?;
    if contents.is_empty() {
        return Ok(redirect_to_empty_cart(session).await);
    }

    Ok(CheckoutTemplate {
        page: Page::load(session, Some(user)).await,
        form,
        errors,
        cart: CartView::from(&contents),
    }
    .into_response())
}

/// Display the order form, prefilled from the user's profile.
#[instrument(skip(state, session, user, cart))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    cart: CurrentCart,
) -> Result<Response> {
    let profile = AccountService::new(state.pool()).get_user(user.id).await?;
    let form = OrderForm::prefill(&profile);
    render_form(&state, &session, &user, &cart, form, FieldErrors::default()).await
}

/// Place the order.
///
/// Invalid input re-renders the form with field errors and writes nothing.
#[instrument(skip(state, session, user, cart, form))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    cart: CurrentCart,
    Form(form): Form<OrderForm>,
) -> Result<Response> {
    let result = CheckoutService::new(state.pool())
        .place_order(user.id, cart.key(), &form)
        .await;

    match result {
        Ok(order_id) => {
            let id = order_id.to_string();
            add_breadcrumb("checkout", "Order placed", Some(&[("order_id", id.as_str())]));
            if let Err(e) = set_flash(&session, "Thank you! Your order has been placed.").await {
                tracing::warn!("Failed to queue order notice: {e}");
            }
            Ok(Redirect::to(&format!("/orders/{order_id}")).into_response())
        }
        Err(CheckoutServiceError::Invalid(errors)) => {
            render_form(&state, &session, &user, &cart, form, errors).await
        }
        Err(CheckoutServiceError::Checkout(CheckoutError::EmptyCart)) => {
            Ok(redirect_to_empty_cart(&session).await)
        }
        Err(CheckoutServiceError::Checkout(CheckoutError::TotalTooLarge { max })) => {
            tracing::info!(%max, "order total too large");
            render_form(&state, &session, &user, &cart, form, total_too_large_errors()).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Display one of the user's orders.
#[instrument(skip(state, session, user))]
pub async fn order_detail(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(OrderId::new(id), user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    Ok(OrderTemplate {
        page: Page::load(&session, Some(&user)).await,
        order: OrderView::from(&order),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_lines_skip_blanks() {
        let address = Address {
            address1: Some("Lenina 1".to_owned()),
            city: Some("Kazan".to_owned()),
            postal_code: Some("420000".to_owned()),
            country: Some("Russia".to_owned()),
            ..Address::default()
        };

        assert_eq!(
            address_lines(&address),
            vec!["Lenina 1", "420000 Kazan", "Russia"]
        );
    }

    #[test]
    fn test_total_too_large_is_a_form_error() {
        let errors = total_too_large_errors();
        assert!(!errors.is_empty());
        assert!(errors.get("cart").is_some_and(|m| m.contains("too large")));
        assert_eq!(errors.get("email"), None);
    }

    #[test]
    fn test_address_lines_empty() {
        assert!(address_lines(&Address::default()).is_empty());
    }
}
