//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use enf_core::checkout::Address;
use enf_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str = "id, email, first_name, last_name, company, address1, address2, \
                            city, country, province, postal_code, phone, is_staff, \
                            is_superuser, is_active, date_joined, last_login";

/// A user to insert.
///
/// Callers are expected to have sanitized `address` already.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    /// Argon2 PHC string; `None` for accounts that cannot log in.
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub address: Address,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

/// Editable profile fields.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub address: Address,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: Email,
    first_name: String,
    last_name: String,
    company: Option<String>,
    address1: Option<String>,
    address2: Option<String>,
    city: Option<String>,
    country: Option<String>,
    province: Option<String>,
    postal_code: Option<String>,
    phone: Option<String>,
    is_staff: bool,
    is_superuser: bool,
    is_active: bool,
    date_joined: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
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
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            is_active: row.is_active,
            date_joined: row.date_joined,
            last_login: row.last_login,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: Option<String>,
}

/// Map unique violations on the user table to a readable conflict.
fn user_conflict(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let message = match db_err.constraint() {
            Some(name) if name.contains("phone") => "phone already in use",
            _ => "email already exists",
        };
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM shop.user WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM shop.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or phone is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let address = &new.address;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO shop.user (
                email, password_hash, first_name, last_name, company, address1, address2,
                city, country, province, postal_code, phone, is_staff, is_superuser, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&new.email)
        .bind(new.password_hash.as_deref())
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(address.company.as_deref())
        .bind(address.address1.as_deref())
        .bind(address.address2.as_deref())
        .bind(address.city.as_deref())
        .bind(address.country.as_deref())
        .bind(address.province.as_deref())
        .bind(address.postal_code.as_deref())
        .bind(address.phone.as_deref())
        .bind(new.is_staff)
        .bind(new.is_superuser)
        .bind(new.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(user_conflict)?;

        Ok(row.into())
    }

    /// Get a user together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM shop.user WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user.into(), r.password_hash)))
    }

    /// Replace the editable profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist and
    /// `RepositoryError::Conflict` if the phone number belongs to someone else.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let address = &update.address;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE shop.user
            SET first_name = $2, last_name = $3, company = $4, address1 = $5, address2 = $6,
                city = $7, country = $8, province = $9, postal_code = $10, phone = $11
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(address.company.as_deref())
        .bind(address.address1.as_deref())
        .bind(address.address2.as_deref())
        .bind(address.city.as_deref())
        .bind(address.country.as_deref())
        .bind(address.province.as_deref())
        .bind(address.postal_code.as_deref())
        .bind(address.phone.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(user_conflict)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Stamp a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE shop.user SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
