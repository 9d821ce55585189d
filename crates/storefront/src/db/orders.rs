//! Order repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use enf_core::cart::LineKey;
use enf_core::checkout::{Address, ContactDetails, OrderDraft, OrderLine};
use enf_core::{
    Email, OrderId, OrderItemId, OrderStatus, PaymentProvider, Price, ProductId, ProductSizeId,
    UserId,
};

use super::{RepositoryError, stored_count, to_column};
use crate::models::{Order, OrderItem, OrderWithItems, PaymentReference};

const ORDER_COLUMNS: &str = "id, user_id, first_name, last_name, email, company, address1, \
                             address2, city, country, province, postal_code, phone, \
                             special_instructions, total_price, status, payment_provider, \
                             stripe_payment_intent_id, heleket_payment_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    first_name: String,
    last_name: String,
    email: Email,
    company: Option<String>,
    address1: Option<String>,
    address2: Option<String>,
    city: Option<String>,
    country: Option<String>,
    province: Option<String>,
    postal_code: Option<String>,
    phone: Option<String>,
    special_instructions: Option<String>,
    total_price: Price,
    status: OrderStatus,
    payment_provider: Option<PaymentProvider>,
    stripe_payment_intent_id: Option<String>,
    heleket_payment_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            contact: ContactDetails {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                address: Address {
                    company: row.company,
                    address1: row.address1,
                    address2: row.address2,
                    city: row.city,
                    country: row.country,
                    province: row.province,
                    postal_code: row.postal_code,
                    phone: row.phone,
                },
                special_instructions: row.special_instructions,
            },
            total_price: row.total_price,
            status: row.status,
            payment_provider: row.payment_provider,
            stripe_payment_intent_id: row.stripe_payment_intent_id,
            heleket_payment_id: row.heleket_payment_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    product_size_id: ProductSizeId,
    quantity: i32,
    price: Price,
    product_name: String,
    product_slug: String,
    size_name: String,
}

impl TryFrom<ItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            line: OrderLine {
                key: LineKey::new(row.product_id, row.product_size_id),
                quantity: stored_count(row.quantity, "quantity")?,
                price: row.price,
            },
            product_name: row.product_name,
            product_slug: row.product_slug,
            size_name: row.size_name,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its lines.
    ///
    /// Runs on the caller's connection so checkout can place the order and
    /// clear the cart in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: UserId,
        draft: &OrderDraft,
    ) -> Result<OrderId, RepositoryError> {
        let contact = draft.contact();
        let address = &contact.address;

        let order_id = sqlx::query_scalar::<_, OrderId>(
            r"
            INSERT INTO shop.order (
                user_id, first_name, last_name, email, company, address1, address2,
                city, country, province, postal_code, phone, special_instructions,
                total_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(&contact.email)
        .bind(address.company.as_deref())
        .bind(address.address1.as_deref())
        .bind(address.address2.as_deref())
        .bind(address.city.as_deref())
        .bind(address.country.as_deref())
        .bind(address.province.as_deref())
        .bind(address.postal_code.as_deref())
        .bind(address.phone.as_deref())
        .bind(contact.special_instructions.as_deref())
        .bind(draft.total_price())
        .fetch_one(&mut *conn)
        .await?;

        for item in draft.items() {
            sqlx::query(
                r"
                INSERT INTO shop.order_item (order_id, product_id, product_size_id, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(order_id)
            .bind(item.key.product_id)
            .bind(item.key.product_size_id)
            .bind(to_column(item.quantity, "quantity")?)
            .bind(item.price)
            .execute(&mut *conn)
            .await?;
        }

        Ok(order_id)
    }

    /// Get an order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = self.items(id).await?;
        Ok(Some(OrderWithItems {
            order: row.into(),
            items,
        }))
    }

    /// Get an order only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        Ok(self
            .get(id)
            .await?
            .filter(|found| found.order.user_id == user_id))
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.product_size_id, oi.quantity, oi.price,
                   p.name AS product_name, p.slug AS product_slug, s.name AS size_name
            FROM shop.order_item oi
            JOIN shop.product p ON p.id = oi.product_id
            JOIN shop.product_size ps ON ps.id = oi.product_size_id
            JOIN shop.size s ON s.id = ps.size_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    /// Record the provider and payment id for an order.
    ///
    /// The id column of the other provider is cleared, so an order only ever
    /// carries the reference of its current provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn attach_payment(
        &self,
        id: OrderId,
        reference: &PaymentReference,
    ) -> Result<Order, RepositoryError> {
        let (stripe_id, heleket_id) = match reference {
            PaymentReference::Stripe(pi) => (Some(pi.as_str()), None),
            PaymentReference::Heleket(payment) => (None, Some(payment.as_str())),
        };

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE shop.order
            SET payment_provider = $2,
                stripe_payment_intent_id = $3,
                heleket_payment_id = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(reference.provider())
        .bind(stripe_id)
        .bind(heleket_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Move an order to `next` if the lifecycle allows it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist and
    /// `RepositoryError::Conflict` if the transition is not allowed.
    pub async fn transition_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM shop.order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "order {id} cannot move from {current} to {next}"
            )));
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE shop.order SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }
}
