//! Account service.
//!
//! User creation rules, registration, and password login. Users are keyed by
//! email; passwords are stored as Argon2id PHC strings.

mod error;

pub use error::AccountError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use enf_core::checkout::Address;
use enf_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, ProfileUpdate, UserRepository};
use crate::forms::{MIN_PASSWORD_LENGTH, Registration};
use crate::models::User;

/// Optional attributes for a new user.
///
/// Unset flags take the defaults of the creating operation.
#[derive(Debug, Clone, Default)]
pub struct ExtraFields {
    pub address: Address,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
}

/// Account service.
pub struct AccountService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Create a user.
    ///
    /// Without a password the account is created but cannot log in.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::EmptyEmail` if `email` is blank.
    /// Returns `AccountError::InvalidEmail` if the email format is invalid.
    /// Returns `AccountError::AlreadyExists` if the email or phone is taken.
    #[instrument(skip(self, password, extra))]
    pub async fn create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: Option<&str>,
        extra: ExtraFields,
    ) -> Result<User, AccountError> {
        let email = parse_required_email(email)?;
        let password_hash = password.map(hash_password).transpose()?;

        let new = NewUser {
            email,
            password_hash,
            first_name: first_name.trim().to_owned(),
            last_name: last_name.trim().to_owned(),
            address: extra.address.sanitized(),
            is_staff: extra.is_staff.unwrap_or(false),
            is_superuser: extra.is_superuser.unwrap_or(false),
            is_active: extra.is_active.unwrap_or(true),
        };

        let user = self.users.create(&new).await.map_err(map_conflict)?;
        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Create a superuser.
    ///
    /// `is_staff` and `is_superuser` default to `true`; passing `false` for
    /// either is rejected before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::SuperuserFlags` if a privilege flag is `false`,
    /// otherwise the errors of [`Self::create_user`].
    pub async fn create_superuser(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: Option<&str>,
        mut extra: ExtraFields,
    ) -> Result<User, AccountError> {
        let is_staff = *extra.is_staff.get_or_insert(true);
        let is_superuser = *extra.is_superuser.get_or_insert(true);

        if !is_staff {
            return Err(AccountError::SuperuserFlags("is_staff"));
        }
        if !is_superuser {
            return Err(AccountError::SuperuserFlags("is_superuser"));
        }

        self.create_user(email, first_name, last_name, password, extra)
            .await
    }

    /// Register a customer from a validated registration form.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::WeakPassword` if the password is too short.
    /// Returns `AccountError::AlreadyExists` if the email is already registered.
    pub async fn register(&self, registration: &Registration) -> Result<User, AccountError> {
        validate_password(&registration.password)?;

        self.create_user(
            registration.email.as_str(),
            &registration.first_name,
            &registration.last_name,
            Some(&registration.password),
            ExtraFields::default(),
        )
        .await
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidCredentials` if the email/password is
    /// wrong or the account is inactive or has no password.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = Email::parse(email).map_err(|_| AccountError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        let password_hash = password_hash.ok_or(AccountError::InvalidCredentials)?;
        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AccountError::InvalidCredentials);
        }

        self.users.record_login(user.id).await?;
        Ok(user)
    }

    /// Replace a user's editable profile fields.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UserNotFound` if the user doesn't exist.
    /// Returns `AccountError::AlreadyExists` if the phone belongs to another user.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AccountError> {
        let update = ProfileUpdate {
            address: update.address.sanitized(),
            ..update
        };

        self.users
            .update_profile(user_id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AccountError::UserNotFound,
                other => map_conflict(other),
            })
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AccountError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }
}

fn map_conflict(e: RepositoryError) -> AccountError {
    match e {
        RepositoryError::Conflict(message) => AccountError::AlreadyExists(message),
        other => AccountError::Repository(other),
    }
}

fn parse_required_email(email: &str) -> Result<Email, AccountError> {
    if email.trim().is_empty() {
        return Err(AccountError::EmptyEmail);
    }
    Ok(Email::parse(email)?)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AccountError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AccountError::PasswordHash)
}

/// Verify a password against a PHC hash string.
///
/// # Errors
///
/// Returns `AccountError::InvalidCredentials` on mismatch or a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AccountError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AccountError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AccountError::InvalidCredentials)
}
