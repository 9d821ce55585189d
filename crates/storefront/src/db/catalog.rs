//! Catalog repository: categories, sizes, products, variants and images.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use enf_core::text::{SlugError, resolve_slug};
use enf_core::{CategoryId, Price, ProductId, ProductImageId, ProductSizeId, SizeId};

use super::{RepositoryError, conflict_on_unique, stored_count, to_column};
use crate::models::{Category, Product, ProductDetail, ProductImage, ProductSize, Size};

const PRODUCT_COLUMNS: &str = "id, name, slug, category_id, color, price, description, \
                               main_image, created_at, updated_at";

/// A category to insert, with its slug already resolved.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

impl NewCategory {
    /// Build a category, deriving the slug from the name unless one is given.
    ///
    /// # Errors
    ///
    /// Returns `SlugError` if no usable slug can be produced.
    pub fn new(name: &str, slug: Option<&str>) -> Result<Self, SlugError> {
        Ok(Self {
            name: name.trim().to_owned(),
            slug: resolve_slug(slug, name)?,
        })
    }
}

/// A product to insert, with its slug already resolved.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub category_id: CategoryId,
    pub color: String,
    pub price: Price,
    pub description: String,
    pub main_image: Option<String>,
}

impl NewProduct {
    /// Build a product, deriving the slug from the name unless one is given.
    ///
    /// # Errors
    ///
    /// Returns `SlugError` if no usable slug can be produced.
    pub fn new(
        name: &str,
        slug: Option<&str>,
        category_id: CategoryId,
        price: Price,
    ) -> Result<Self, SlugError> {
        Ok(Self {
            name: name.trim().to_owned(),
            slug: resolve_slug(slug, name)?,
            category_id,
            color: String::new(),
            price,
            description: String::new(),
            main_image: None,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SizeRow {
    id: SizeId,
    name: String,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    slug: String,
    category_id: CategoryId,
    color: String,
    price: Price,
    description: String,
    main_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            category_id: row.category_id,
            color: row.color,
            price: row.price,
            description: row.description,
            main_image: row.main_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductSizeRow {
    id: ProductSizeId,
    product_id: ProductId,
    size_id: SizeId,
    size_name: String,
    stock: i32,
}

impl TryFrom<ProductSizeRow> for ProductSize {
    type Error = RepositoryError;

    fn try_from(row: ProductSizeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            size_id: row.size_id,
            size_name: row.size_name,
            stock: stored_count(row.stock, "stock")?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductImageRow {
    id: ProductImageId,
    product_id: ProductId,
    image: String,
}

/// Repository for catalog database operations.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Insert a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_category(&self, new: &NewCategory) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO shop.category (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(&new.name)
        .bind(&new.slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category slug already exists"))?;

        Ok(row.into())
    }

    /// Get a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug FROM shop.category WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Category::from))
    }

    /// Get a category by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row =
            sqlx::query_as::<_, CategoryRow>("SELECT id, name, slug FROM shop.category WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Category::from))
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug FROM shop.category ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    // =========================================================================
    // Sizes
    // =========================================================================

    /// Get the size with this label, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create_size(&self, name: &str) -> Result<Size, RepositoryError> {
        let row = sqlx::query_as::<_, SizeRow>(
            r"
            INSERT INTO shop.size (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            ",
        )
        .bind(name.trim())
        .fetch_one(self.pool)
        .await?;

        Ok(Size {
            id: row.id,
            name: row.name,
        })
    }

    /// List all sizes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_sizes(&self) -> Result<Vec<Size>, RepositoryError> {
        let rows = sqlx::query_as::<_, SizeRow>("SELECT id, name FROM shop.size ORDER BY id")
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Size {
                id: row.id,
                name: row.name,
            })
            .collect())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_product(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO shop.product
                (name, slug, category_id, color, price, description, main_image)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&new.name)
        .bind(&new.slug)
        .bind(new.category_id)
        .bind(&new.color)
        .bind(new.price)
        .bind(&new.description)
        .bind(new.main_image.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product slug already exists"))?;

        Ok(row.into())
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// List products newest first, optionally within one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(
        &self,
        category: Option<CategoryId>,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM shop.product
            WHERE $1::BIGINT IS NULL OR category_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        ))
        .bind(category)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Load a product with its category, sizes and images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the category is missing.
    pub async fn product_detail(&self, slug: &str) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = self.get_product_by_slug(slug).await? else {
            return Ok(None);
        };

        let category = self.get_category(product.category_id).await?.ok_or_else(|| {
            RepositoryError::DataCorruption(format!("product {} has no category", product.id))
        })?;
        let sizes = self.list_product_sizes(product.id).await?;
        let images = self.list_product_images(product.id).await?;

        Ok(Some(ProductDetail {
            product,
            category,
            sizes,
            images,
        }))
    }

    /// Change a product's current price.
    ///
    /// Carts pick the new price up immediately; placed orders keep theirs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update_product_price(
        &self,
        id: ProductId,
        price: Price,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE shop.product SET price = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(price)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    // =========================================================================
    // Product sizes and images
    // =========================================================================

    /// Offer a product in a size, setting the stock level.
    ///
    /// Re-adding an existing (product, size) pair updates its stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_product_size(
        &self,
        product_id: ProductId,
        size_id: SizeId,
        stock: u32,
    ) -> Result<ProductSize, RepositoryError> {
        let row = sqlx::query_as::<_, ProductSizeRow>(
            r"
            WITH upserted AS (
                INSERT INTO shop.product_size (product_id, size_id, stock)
                VALUES ($1, $2, $3)
                ON CONFLICT (product_id, size_id) DO UPDATE SET stock = EXCLUDED.stock
                RETURNING id, product_id, size_id, stock
            )
            SELECT u.id, u.product_id, u.size_id, s.name AS size_name, u.stock
            FROM upserted u
            JOIN shop.size s ON s.id = u.size_id
            ",
        )
        .bind(product_id)
        .bind(size_id)
        .bind(to_column(stock, "stock")?)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Current unit price for a product in a size.
    ///
    /// Returns `None` unless the size variant exists and belongs to the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variant_price(
        conn: &mut PgConnection,
        product_id: ProductId,
        product_size_id: ProductSizeId,
    ) -> Result<Option<Price>, RepositoryError> {
        let price = sqlx::query_scalar::<_, Price>(
            r"
            SELECT p.price
            FROM shop.product_size ps
            JOIN shop.product p ON p.id = ps.product_id
            WHERE ps.id = $1 AND ps.product_id = $2
            ",
        )
        .bind(product_size_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await?;

        Ok(price)
    }

    /// Get one size variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product_size(
        &self,
        id: ProductSizeId,
    ) -> Result<Option<ProductSize>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductSizeRow>(
            r"
            SELECT ps.id, ps.product_id, ps.size_id, s.name AS size_name, ps.stock
            FROM shop.product_size ps
            JOIN shop.size s ON s.id = ps.size_id
            WHERE ps.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(ProductSize::try_from).transpose()
    }

    /// List the size variants of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_product_sizes(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductSize>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductSizeRow>(
            r"
            SELECT ps.id, ps.product_id, ps.size_id, s.name AS size_name, ps.stock
            FROM shop.product_size ps
            JOIN shop.size s ON s.id = ps.size_id
            WHERE ps.product_id = $1
            ORDER BY s.id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ProductSize::try_from).collect()
    }

    /// Attach an extra image to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_product_image(
        &self,
        product_id: ProductId,
        image: &str,
    ) -> Result<ProductImage, RepositoryError> {
        let row = sqlx::query_as::<_, ProductImageRow>(
            r"
            INSERT INTO shop.product_image (product_id, image)
            VALUES ($1, $2)
            RETURNING id, product_id, image
            ",
        )
        .bind(product_id)
        .bind(image)
        .fetch_one(self.pool)
        .await?;

        Ok(ProductImage {
            id: row.id,
            product_id: row.product_id,
            image: row.image,
        })
    }

    /// List the extra images of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_product_images(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductImageRow>(
            "SELECT id, product_id, image FROM shop.product_image WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProductImage {
                id: row.id,
                product_id: row.product_id,
                image: row.image,
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_product_derives_slug() {
        let product =
            NewProduct::new("Oversize Hoodie", None, CategoryId::new(1), Price::ZERO).unwrap();
        assert_eq!(product.slug, "oversize-hoodie");
    }

    #[test]
    fn test_new_category_keeps_explicit_slug() {
        let category = NewCategory::new("Hoodies", Some("hoodies-2026")).unwrap();
        assert_eq!(category.slug, "hoodies-2026");
        assert!(NewCategory::new("???", None).is_err());
    }
}
