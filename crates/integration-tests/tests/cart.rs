//! Session cart behavior against a real database.
//!
//! Requires a migrated `PostgreSQL` at `DATABASE_URL`.

use enf_core::cart::CartError;
use enf_core::{CartItemId, Price};
use enf_storefront::db::CatalogRepository;
use enf_storefront::services::{CartService, CartServiceError};
use enf_integration_tests::{cart_key, seed_product, test_pool};
use rust_decimal_macros::dec;
use tokio::task::JoinSet;

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_adding_same_variant_merges_lines() {
    let pool = test_pool().await;
    let product = seed_product(&pool, dec!(10.00)).await;
    let carts = CartService::new(&pool);
    let key = cart_key();

    carts
        .add_product(&key, product.product_id, product.product_size_id, 2)
        .await
        .expect("first add");
    let line = carts
        .add_product(&key, product.product_id, product.product_size_id, 3)
        .await
        .expect("second add");

    assert_eq!(line.quantity, 5);

    let contents = carts.contents(&key).await.expect("contents");
    assert_eq!(contents.items.len(), 1);
    assert_eq!(contents.total_items(), 5);
    assert_eq!(contents.subtotal().expect("subtotal").amount(), dec!(50.00));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_adds_to_one_cart_are_all_counted() {
    const ADDS: u32 = 8;

    let pool = test_pool().await;
    let product = seed_product(&pool, dec!(2.50)).await;
    let key = cart_key();

    let mut tasks = JoinSet::new();
    for _ in 0..ADDS {
        let pool = pool.clone();
        let key = key.clone();
        tasks.spawn(async move {
            CartService::new(&pool)
                .add_product(&key, product.product_id, product.product_size_id, 1)
                .await
                .map(|line| line.quantity)
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.expect("task panicked").expect("add");
    }

    let contents = CartService::new(&pool).contents(&key).await.expect("contents");
    assert_eq!(contents.items.len(), 1);
    assert_eq!(contents.total_items(), u64::from(ADDS));
    assert_eq!(contents.subtotal().expect("subtotal").amount(), dec!(20.00));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_zero_quantity_is_rejected() {
    let pool = test_pool().await;
    let product = seed_product(&pool, dec!(10.00)).await;
    let carts = CartService::new(&pool);
    let key = cart_key();

    let result = carts
        .add_product(&key, product.product_id, product.product_size_id, 0)
        .await;

    assert!(matches!(
        result,
        Err(CartServiceError::Cart(CartError::ZeroQuantity))
    ));
    assert_eq!(carts.total_items(&key).await.expect("count"), 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_size_of_another_product_is_unknown() {
    let pool = test_pool().await;
    let first = seed_product(&pool, dec!(10.00)).await;
    let second = seed_product(&pool, dec!(12.00)).await;
    let carts = CartService::new(&pool);

    let result = carts
        .add_product(&cart_key(), first.product_id, second.product_size_id, 1)
        .await;

    assert!(matches!(result, Err(CartServiceError::UnknownVariant)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_update_to_zero_removes_line() {
    let pool = test_pool().await;
    let product = seed_product(&pool, dec!(7.50)).await;
    let carts = CartService::new(&pool);
    let key = cart_key();

    let line = carts
        .add_product(&key, product.product_id, product.product_size_id, 4)
        .await
        .expect("add");
    let item_id = line.id.expect("persisted line has an id");

    assert!(carts.update_item_quantity(&key, item_id, 1).await.expect("update"));
    assert_eq!(carts.total_items(&key).await.expect("count"), 1);

    assert!(carts.update_item_quantity(&key, item_id, 0).await.expect("update"));
    assert!(carts.contents(&key).await.expect("contents").is_empty());

    // The line is gone now
    assert!(!carts.update_item_quantity(&key, item_id, 2).await.expect("update"));
    assert!(!carts.remove_item(&key, item_id).await.expect("remove"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_lines_of_other_carts_are_not_touched() {
    let pool = test_pool().await;
    let product = seed_product(&pool, dec!(5.00)).await;
    let carts = CartService::new(&pool);
    let (mine, theirs) = (cart_key(), cart_key());

    let line = carts
        .add_product(&theirs, product.product_id, product.product_size_id, 1)
        .await
        .expect("add");
    carts
        .add_product(&mine, product.product_id, product.product_size_id, 1)
        .await
        .expect("add");
    let their_item = line.id.expect("persisted line has an id");

    assert!(!carts.remove_item(&mine, their_item).await.expect("remove"));
    assert!(!carts.remove_item(&cart_key(), CartItemId::new(i64::MAX)).await.expect("remove"));
    assert_eq!(carts.total_items(&theirs).await.expect("count"), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_subtotal_follows_current_price() {
    let pool = test_pool().await;
    let product = seed_product(&pool, dec!(20.00)).await;
    let carts = CartService::new(&pool);
    let key = cart_key();

    carts
        .add_product(&key, product.product_id, product.product_size_id, 2)
        .await
        .expect("add");
    assert_eq!(carts.subtotal(&key).await.expect("subtotal").amount(), dec!(40.00));

    let new_price = Price::new(dec!(15.00)).expect("valid price");
    CatalogRepository::new(&pool)
        .update_product_price(product.product_id, new_price)
        .await
        .expect("price update");

    assert_eq!(carts.subtotal(&key).await.expect("subtotal").amount(), dec!(30.00));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_clear_empties_cart() {
    let pool = test_pool().await;
    let first = seed_product(&pool, dec!(3.00)).await;
    let second = seed_product(&pool, dec!(4.00)).await;
    let carts = CartService::new(&pool);
    let key = cart_key();

    for product in [first, second] {
        carts
            .add_product(&key, product.product_id, product.product_size_id, 1)
            .await
            .expect("add");
    }
    assert_eq!(carts.total_items(&key).await.expect("count"), 2);

    carts.clear(&key).await.expect("clear");
    assert_eq!(carts.total_items(&key).await.expect("count"), 0);
    assert_eq!(carts.subtotal(&key).await.expect("subtotal").amount(), dec!(0));
}
