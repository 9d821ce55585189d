//! Cart repository.
//!
//! Carts are keyed by a per-session cart key. Mutations go through
//! [`CartRepository::lock`] and [`CartRepository::persist`] inside one
//! transaction: the cart row is locked `FOR UPDATE`, the lines are loaded
//! into the [`Cart`] aggregate, and the change the aggregate reports is
//! written back. Concurrent requests for the same cart queue on the row lock.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use enf_core::cart::{Cart, CartLine, LineChange, LineKey};
use enf_core::{CartId, CartItemId, Price, ProductId, ProductSizeId};

use super::{RepositoryError, conflict_on_unique, stored_count, to_column};
use crate::models::{CartContents, CartItemDetail};

#[derive(sqlx::FromRow)]
struct LineRow {
    id: CartItemId,
    product_id: ProductId,
    product_size_id: ProductSizeId,
    quantity: i32,
    unit_price: Price,
}

impl TryFrom<LineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(row.id),
            key: LineKey::new(row.product_id, row.product_size_id),
            quantity: stored_count(row.quantity, "quantity")?,
            unit_price: row.unit_price,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    id: CartItemId,
    product_id: ProductId,
    product_size_id: ProductSizeId,
    quantity: i32,
    unit_price: Price,
    product_name: String,
    product_slug: String,
    size_name: String,
    main_image: Option<String>,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the cart for a cart key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, cart_key: &str) -> Result<Option<CartId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartId>(
            "SELECT id FROM shop.cart WHERE session_key = $1",
        )
        .bind(cart_key)
        .fetch_optional(self.pool)
        .await?;

        Ok(id)
    }

    /// Get the cart for a cart key, creating an empty one if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, cart_key: &str) -> Result<CartId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartId>(
            r"
            INSERT INTO shop.cart (session_key)
            VALUES ($1)
            ON CONFLICT (session_key) DO UPDATE SET updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(cart_key)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Load a cart's lines with display data, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored quantity is invalid.
    pub async fn contents(&self, cart_id: CartId) -> Result<CartContents, RepositoryError> {
        let rows = sqlx::query_as::<_, DetailRow>(
            r"
            SELECT ci.id, ci.product_id, ci.product_size_id, ci.quantity,
                   p.price AS unit_price, p.name AS product_name, p.slug AS product_slug,
                   s.name AS size_name, p.main_image
            FROM shop.cart_item ci
            JOIN shop.product p ON p.id = ci.product_id
            JOIN shop.product_size ps ON ps.id = ci.product_size_id
            JOIN shop.size s ON s.id = ps.size_id
            WHERE ci.cart_id = $1
            ORDER BY ci.added_at, ci.id
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| {
                Ok(CartItemDetail {
                    line: CartLine {
                        id: Some(row.id),
                        key: LineKey::new(row.product_id, row.product_size_id),
                        quantity: stored_count(row.quantity, "quantity")?,
                        unit_price: row.unit_price,
                    },
                    product_name: row.product_name,
                    product_slug: row.product_slug,
                    size_name: row.size_name,
                    main_image: row.main_image,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(CartContents {
            id: Some(cart_id),
            items,
        })
    }

    /// Lock a cart row and load its lines priced at current product prices.
    ///
    /// Must run inside a transaction; the lock is held until it ends.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart does not exist.
    pub async fn lock(conn: &mut PgConnection, cart_id: CartId) -> Result<Cart, RepositoryError> {
        sqlx::query_scalar::<_, CartId>("SELECT id FROM shop.cart WHERE id = $1 FOR UPDATE")
            .bind(cart_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let rows = sqlx::query_as::<_, LineRow>(
            r"
            SELECT ci.id, ci.product_id, ci.product_size_id, ci.quantity, p.price AS unit_price
            FROM shop.cart_item ci
            JOIN shop.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.added_at, ci.id
            ",
        )
        .bind(cart_id)
        .fetch_all(&mut *conn)
        .await?;

        let lines = rows
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Cart::new(cart_id, lines))
    }

    /// Write one aggregate change for a locked cart.
    ///
    /// Returns the id of the inserted line for `LineChange::Inserted`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an insert races an unlocked
    /// writer, `RepositoryError::Database` for other failures.
    pub async fn persist(
        conn: &mut PgConnection,
        cart_id: CartId,
        change: LineChange,
    ) -> Result<Option<CartItemId>, RepositoryError> {
        let inserted = match change {
            LineChange::Inserted { key, quantity } => {
                let id = sqlx::query_scalar::<_, CartItemId>(
                    r"
                    INSERT INTO shop.cart_item (cart_id, product_id, product_size_id, quantity)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id
                    ",
                )
                .bind(cart_id)
                .bind(key.product_id)
                .bind(key.product_size_id)
                .bind(to_column(quantity, "quantity")?)
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| conflict_on_unique(e, "cart line already exists"))?;
                Some(id)
            }
            LineChange::QuantitySet { key, quantity } => {
                sqlx::query(
                    r"
                    UPDATE shop.cart_item SET quantity = $4
                    WHERE cart_id = $1 AND product_id = $2 AND product_size_id = $3
                    ",
                )
                .bind(cart_id)
                .bind(key.product_id)
                .bind(key.product_size_id)
                .bind(to_column(quantity, "quantity")?)
                .execute(&mut *conn)
                .await?;
                None
            }
            LineChange::Removed { key } => {
                sqlx::query(
                    r"
                    DELETE FROM shop.cart_item
                    WHERE cart_id = $1 AND product_id = $2 AND product_size_id = $3
                    ",
                )
                .bind(cart_id)
                .bind(key.product_id)
                .bind(key.product_size_id)
                .execute(&mut *conn)
                .await?;
                None
            }
            LineChange::Cleared => {
                sqlx::query("DELETE FROM shop.cart_item WHERE cart_id = $1")
                    .bind(cart_id)
                    .execute(&mut *conn)
                    .await?;
                None
            }
        };

        sqlx::query("UPDATE shop.cart SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *conn)
            .await?;

        Ok(inserted)
    }

    /// Delete carts not touched since `cutoff`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart WHERE updated_at < $1")
            .bind(cutoff)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
