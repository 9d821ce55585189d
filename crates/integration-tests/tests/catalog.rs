//! Catalog storage: slugs, variants and product detail.
//!
//! Requires a migrated `PostgreSQL` at `DATABASE_URL`.

use enf_core::Price;
use enf_storefront::db::catalog::{NewCategory, NewProduct};
use enf_storefront::db::{CatalogRepository, RepositoryError};
use enf_integration_tests::{seed_product, test_pool, unique};
use rust_decimal_macros::dec;

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_slug_derived_from_name_unless_given() {
    let pool = test_pool().await;
    let catalog = CatalogRepository::new(&pool);

    let name = format!("Summer {}", unique("Dress"));
    let derived = NewCategory::new(&name, None).expect("valid category");
    let category = catalog.create_category(&derived).await.expect("create");
    assert_eq!(category.slug, name.to_lowercase().replace(' ', "-"));

    let explicit_slug = unique("hand-picked");
    let price = Price::new(dec!(30.00)).expect("valid price");
    let product = NewProduct::new("Linen Shirt", Some(&explicit_slug), category.id, price)
        .expect("valid product");
    let product = catalog.create_product(&product).await.expect("create");
    assert_eq!(product.slug, explicit_slug);
    assert_eq!(product.name, "Linen Shirt");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_duplicate_slug_conflicts() {
    let pool = test_pool().await;
    let catalog = CatalogRepository::new(&pool);

    let category = NewCategory::new(&unique("Shoes"), None).expect("valid category");
    catalog.create_category(&category).await.expect("create");

    assert!(matches!(
        catalog.create_category(&category).await,
        Err(RepositoryError::Conflict(_))
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_product_detail_lists_sizes() {
    let pool = test_pool().await;
    let catalog = CatalogRepository::new(&pool);
    let seeded = seed_product(&pool, dec!(45.00)).await;

    let product = catalog
        .get_product(seeded.product_id)
        .await
        .expect("query")
        .expect("product exists");
    let detail = catalog
        .product_detail(&product.slug)
        .await
        .expect("query")
        .expect("detail exists");

    assert_eq!(detail.product.id, seeded.product_id);
    assert_eq!(detail.category.id, product.category_id);
    assert!(
        detail
            .sizes
            .iter()
            .any(|size| size.id == seeded.product_size_id && size.in_stock())
    );
    assert!(catalog.product_detail("no-such-product").await.expect("query").is_none());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_restocking_updates_existing_variant() {
    let pool = test_pool().await;
    let catalog = CatalogRepository::new(&pool);
    let seeded = seed_product(&pool, dec!(5.00)).await;

    let variant = catalog
        .get_product_size(seeded.product_size_id)
        .await
        .expect("query")
        .expect("variant exists");
    let restocked = catalog
        .upsert_product_size(seeded.product_id, variant.size_id, 0)
        .await
        .expect("upsert");

    assert_eq!(restocked.id, seeded.product_size_id);
    assert!(!restocked.in_stock());
}
