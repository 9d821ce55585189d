//! Catalog domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use enf_core::{CategoryId, Price, ProductId, ProductImageId, ProductSizeId, SizeId};

/// A product category.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Unique URL slug.
    pub slug: String,
}

/// A size label (S, M, 42, ...).
#[derive(Debug, Clone, Serialize)]
pub struct Size {
    pub id: SizeId,
    pub name: String,
}

/// A product as listed in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unique URL slug.
    pub slug: String,
    pub category_id: CategoryId,
    pub color: String,
    /// Current price. Carts use it live; orders copy it.
    pub price: Price,
    pub description: String,
    /// Path of the main image under the media root.
    pub main_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A size variant of a product with its stock level.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSize {
    pub id: ProductSizeId,
    pub product_id: ProductId,
    pub size_id: SizeId,
    /// Denormalized size label.
    pub size_name: String,
    pub stock: u32,
}

impl ProductSize {
    /// Whether any units are left.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// An extra product image.
#[derive(Debug, Clone, Serialize)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    /// Path under the media root.
    pub image: String,
}

/// A product with everything its detail page shows.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Category,
    pub sizes: Vec<ProductSize>,
    pub images: Vec<ProductImage>,
}
