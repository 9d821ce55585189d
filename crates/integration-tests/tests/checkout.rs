//! Placing orders from a session cart.
//!
//! Requires a migrated `PostgreSQL` at `DATABASE_URL`.

use enf_core::checkout::CheckoutError;
use enf_core::{OrderId, OrderStatus, PaymentProvider, Price};
use enf_storefront::db::{CatalogRepository, OrderRepository};
use enf_storefront::forms::OrderForm;
use enf_storefront::models::{PaymentReference, User};
use enf_storefront::services::accounts::ExtraFields;
use enf_storefront::services::{
    AccountService, CartService, CheckoutService, CheckoutServiceError, PaymentError,
    PaymentService,
};
use enf_integration_tests::{cart_key, seed_product, test_pool, unique};
use rust_decimal_macros::dec;
use sqlx::PgPool;

async fn shopper(pool: &PgPool) -> User {
    AccountService::new(pool)
        .create_user(
            &format!("{}@example.com", unique("shopper")),
            "Ada",
            "Lovelace",
            None,
            ExtraFields::default(),
        )
        .await
        .expect("Failed to create user")
}

fn order_form(user: &User) -> OrderForm {
    let mut form = OrderForm::prefill(user);
    form.address.address1 = "1 Main Street".to_owned();
    form.address.city = "Springfield".to_owned();
    form.special_instructions = "Leave at the door".to_owned();
    form
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_order_snapshots_prices_and_clears_cart() {
    let pool = test_pool().await;
    let user = shopper(&pool).await;
    let product = seed_product(&pool, dec!(25.00)).await;
    let key = cart_key();

    CartService::new(&pool)
        .add_product(&key, product.product_id, product.product_size_id, 2)
        .await
        .expect("add");

    let order_id = CheckoutService::new(&pool)
        .place_order(user.id, &key, &order_form(&user))
        .await
        .expect("order placed");

    assert!(
        CartService::new(&pool)
            .contents(&key)
            .await
            .expect("contents")
            .is_empty()
    );

    // Later price changes do not reach the placed order
    let new_price = Price::new(dec!(99.00)).expect("valid price");
    CatalogRepository::new(&pool)
        .update_product_price(product.product_id, new_price)
        .await
        .expect("price update");

    let placed = OrderRepository::new(&pool)
        .get_for_user(order_id, user.id)
        .await
        .expect("query")
        .expect("order belongs to the user");

    assert_eq!(placed.order.total_price.amount(), dec!(50.00));
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(
        placed.order.contact.special_instructions.as_deref(),
        Some("Leave at the door")
    );

    let item = placed.items.first().expect("one line");
    assert_eq!(placed.items.len(), 1);
    assert_eq!(item.line.quantity, 2);
    assert_eq!(item.line.price.amount(), dec!(25.00));
}

async fn placed_order(pool: &PgPool) -> OrderId {
    let user = shopper(pool).await;
    let product = seed_product(pool, dec!(9.00)).await;
    let key = cart_key();

    CartService::new(pool)
        .add_product(&key, product.product_id, product.product_size_id, 1)
        .await
        .expect("add");
    CheckoutService::new(pool)
        .place_order(user.id, &key, &order_form(&user))
        .await
        .expect("order placed")
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_total_too_large_keeps_cart_and_writes_nothing() {
    let pool = test_pool().await;
    let user = shopper(&pool).await;
    let product = seed_product(&pool, dec!(5000.00)).await;
    let carts = CartService::new(&pool);
    let key = cart_key();

    carts
        .add_product(&key, product.product_id, product.product_size_id, 30_000)
        .await
        .expect("add");

    let result = CheckoutService::new(&pool)
        .place_order(user.id, &key, &order_form(&user))
        .await;

    assert!(matches!(
        result,
        Err(CheckoutServiceError::Checkout(CheckoutError::TotalTooLarge { .. }))
    ));
    assert_eq!(carts.total_items(&key).await.expect("count"), 30_000);
    assert!(
        OrderRepository::new(&pool)
            .list_for_user(user.id)
            .await
            .expect("orders")
            .is_empty()
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_payment_reference_replaces_previous_provider() {
    let pool = test_pool().await;
    let order_id = placed_order(&pool).await;
    let payments = PaymentService::new(&pool);

    let stripe = PaymentReference::new(PaymentProvider::Stripe, "pi_3NqLx2").expect("reference");
    let order = payments
        .attach_reference(order_id, &stripe)
        .await
        .expect("attach stripe");
    assert_eq!(order.payment_provider, Some(PaymentProvider::Stripe));
    assert_eq!(order.stripe_payment_intent_id.as_deref(), Some("pi_3NqLx2"));
    assert_eq!(order.heleket_payment_id, None);

    let heleket = PaymentReference::new(PaymentProvider::Heleket, "hk-7781").expect("reference");
    let order = payments
        .attach_reference(order_id, &heleket)
        .await
        .expect("attach heleket");
    assert_eq!(order.payment_provider, Some(PaymentProvider::Heleket));
    assert_eq!(order.heleket_payment_id.as_deref(), Some("hk-7781"));
    assert_eq!(order.stripe_payment_intent_id, None);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_payment_reference_for_missing_order() {
    let pool = test_pool().await;
    let reference = PaymentReference::new(PaymentProvider::Stripe, "pi_missing").expect("reference");

    let result = PaymentService::new(&pool)
        .attach_reference(OrderId::new(i64::MAX), &reference)
        .await;

    assert!(matches!(result, Err(PaymentError::OrderNotFound)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_empty_cart_cannot_be_ordered() {
    let pool = test_pool().await;
    let user = shopper(&pool).await;

    let result = CheckoutService::new(&pool)
        .place_order(user.id, &cart_key(), &order_form(&user))
        .await;

    assert!(matches!(
        result,
        Err(CheckoutServiceError::Checkout(CheckoutError::EmptyCart))
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_invalid_form_keeps_cart() {
    let pool = test_pool().await;
    let user = shopper(&pool).await;
    let product = seed_product(&pool, dec!(8.00)).await;
    let key = cart_key();

    CartService::new(&pool)
        .add_product(&key, product.product_id, product.product_size_id, 1)
        .await
        .expect("add");

    let mut form = order_form(&user);
    form.email = "not-an-email".to_owned();
    form.first_name = String::new();

    let result = CheckoutService::new(&pool)
        .place_order(user.id, &key, &form)
        .await;

    let errors = match result {
        Err(CheckoutServiceError::Invalid(errors)) => errors,
        other => panic!("expected field errors, got {other:?}"),
    };
    assert!(errors.get("email").is_some());
    assert!(errors.get("first_name").is_some());
    assert_eq!(
        CartService::new(&pool).total_items(&key).await.expect("count"),
        1
    );
    assert!(
        OrderRepository::new(&pool)
            .list_for_user(user.id)
            .await
            .expect("orders")
            .is_empty()
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_orders_are_private_and_follow_lifecycle() {
    let pool = test_pool().await;
    let owner = shopper(&pool).await;
    let stranger = shopper(&pool).await;
    let product = seed_product(&pool, dec!(12.00)).await;
    let key = cart_key();

    CartService::new(&pool)
        .add_product(&key, product.product_id, product.product_size_id, 1)
        .await
        .expect("add");
    let order_id = CheckoutService::new(&pool)
        .place_order(owner.id, &key, &order_form(&owner))
        .await
        .expect("order placed");

    let orders = OrderRepository::new(&pool);
    assert!(
        orders
            .get_for_user(order_id, stranger.id)
            .await
            .expect("query")
            .is_none()
    );

    let payments = PaymentService::new(&pool);
    let paid = payments.confirm_payment(order_id).await.expect("confirm");
    assert_eq!(paid.status, OrderStatus::Processing);

    payments
        .apply_status(order_id, OrderStatus::Shipped)
        .await
        .expect("ship");
    assert!(matches!(
        payments.cancel(order_id).await,
        Err(PaymentError::InvalidTransition(_))
    ));
}
