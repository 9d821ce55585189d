//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Dresses
//!     slug: dresses            # optional, derived from the name
//!     products:
//!       - name: Summer Dress
//!         price: "49.90"
//!         color: Blue
//!         description: Light cotton dress.
//!         main_image: products/summer-dress.jpg
//!         images: [products/summer-dress-back.jpg]
//!         sizes: { S: 3, M: 5, L: 0 }
//! ```
//!
//! Categories and products are matched by slug, so running the same file
//! twice creates nothing new; size stock levels are updated.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use enf_core::Price;
use enf_storefront::db::CatalogRepository;
use enf_storefront::db::catalog::{NewCategory, NewProduct};

use super::{CommandError, connect};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
}

/// A category and its products.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySeed {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

/// A product with its sizes and extra images.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSeed {
    pub name: String,
    pub slug: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
    pub main_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Size name to stock level.
    #[serde(default)]
    pub sizes: BTreeMap<String, u32>,
}

/// What a seeding run changed.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub categories_created: usize,
    pub products_created: usize,
    pub products_skipped: usize,
    pub sizes_stocked: usize,
}

/// Parse a seed file and check it before touching the database.
///
/// # Errors
///
/// Returns `CommandError::Yaml` for malformed input and `CommandError::Seed`
/// for prices, slugs or duplicates that cannot be stored.
pub fn parse(content: &str) -> Result<CatalogSeed, CommandError> {
    let seed: CatalogSeed = serde_yaml::from_str(content)?;

    let mut product_slugs = BTreeMap::new();
    for category in &seed.categories {
        NewCategory::new(&category.name, category.slug.as_deref())
            .map_err(|e| CommandError::Seed(format!("category '{}': {e}", category.name)))?;

        for product in &category.products {
            Price::new(product.price)
                .map_err(|e| CommandError::Seed(format!("product '{}': {e}", product.name)))?;
            let slug = enf_core::text::resolve_slug(product.slug.as_deref(), &product.name)
                .map_err(|e| CommandError::Seed(format!("product '{}': {e}", product.name)))?;
            if let Some(previous) = product_slugs.insert(slug.clone(), product.name.clone()) {
                return Err(CommandError::Seed(format!(
                    "products '{previous}' and '{}' share the slug '{slug}'",
                    product.name
                )));
            }
        }
    }

    Ok(seed)
}

/// Load the catalog seed file at `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or if a
/// database operation fails.
pub async fn catalog(file_path: &str) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading catalog from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let seed = parse(&content)?;
    info!(categories = seed.categories.len(), "Parsed catalog");

    let pool = connect().await?;
    let summary = apply(&CatalogRepository::new(&pool), &seed).await?;

    info!("Seeding complete!");
    info!("  Categories created: {}", summary.categories_created);
    info!("  Products created: {}", summary.products_created);
    info!("  Products skipped (already exist): {}", summary.products_skipped);
    info!("  Size variants stocked: {}", summary.sizes_stocked);
    Ok(())
}

async fn apply(
    catalog: &CatalogRepository<'_>,
    seed: &CatalogSeed,
) -> Result<SeedSummary, CommandError> {
    let mut summary = SeedSummary::default();

    for entry in &seed.categories {
        let new_category = NewCategory::new(&entry.name, entry.slug.as_deref())
            .map_err(|e| CommandError::Seed(e.to_string()))?;
        let category = match catalog.get_category_by_slug(&new_category.slug).await? {
            Some(existing) => existing,
            None => {
                summary.categories_created += 1;
                catalog.create_category(&new_category).await?
            }
        };

        for item in &entry.products {
            let price = Price::new(item.price).map_err(|e| CommandError::Seed(e.to_string()))?;
            let mut new_product =
                NewProduct::new(&item.name, item.slug.as_deref(), category.id, price)
                    .map_err(|e| CommandError::Seed(e.to_string()))?;

            let product = match catalog.get_product_by_slug(&new_product.slug).await? {
                Some(existing) => {
                    summary.products_skipped += 1;
                    existing
                }
                None => {
                    new_product.color.clone_from(&item.color);
                    new_product.description.clone_from(&item.description);
                    new_product.main_image.clone_from(&item.main_image);
                    let created = catalog.create_product(&new_product).await?;
                    for image in &item.images {
                        catalog.add_product_image(created.id, image).await?;
                    }
                    summary.products_created += 1;
                    created
                }
            };

            for (size_name, stock) in &item.sizes {
                let size = catalog.get_or_create_size(size_name).await?;
                catalog.upsert_product_size(product.id, size.id, *stock).await?;
                summary.sizes_stocked += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: Dresses
    products:
      - name: Summer Dress
        price: "49.90"
        color: Blue
        sizes: { S: 3, M: 5 }
      - name: Evening Dress
        slug: evening
        price: 120
  - name: Shoes
    slug: footwear
"#;

    #[test]
    fn test_parse_sample() {
        let seed = parse(SAMPLE).expect("valid seed");
        assert_eq!(seed.categories.len(), 2);

        let dresses = seed.categories.first().expect("first category");
        let summer = dresses.products.first().expect("first product");
        assert_eq!(summer.price, dec!(49.90));
        assert_eq!(summer.sizes.get("M"), Some(&5));
        assert!(summer.images.is_empty());
        assert_eq!(
            dresses.products.get(1).and_then(|p| p.slug.as_deref()),
            Some("evening")
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = parse("categories:\n  - name: Hats\n    colour: red\n");
        assert!(matches!(result, Err(CommandError::Yaml(_))));
    }

    #[test]
    fn test_duplicate_product_slugs_rejected() {
        let yaml = r"
categories:
  - name: A
    products:
      - { name: Tee, price: 10 }
  - name: B
    products:
      - { name: TEE, price: 12 }
";
        assert!(matches!(parse(yaml), Err(CommandError::Seed(_))));
    }

    #[test]
    fn test_negative_price_rejected() {
        let yaml = "categories:\n  - name: A\n    products:\n      - { name: Tee, price: -1 }\n";
        assert!(matches!(parse(yaml), Err(CommandError::Seed(_))));
    }
}
