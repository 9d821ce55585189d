//! User management commands.

use enf_storefront::models::User;
use enf_storefront::services::AccountService;
use enf_storefront::services::accounts::ExtraFields;

use super::{CommandError, connect};

/// Account details given on the command line.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Option<String>,
}

/// Create a customer account, optionally with staff access.
///
/// # Errors
///
/// Returns an error if the email is invalid or already registered.
pub async fn create(account: &NewAccount, staff: bool) -> Result<(), CommandError> {
    let pool = connect().await?;
    let extra = ExtraFields {
        is_staff: Some(staff),
        ..ExtraFields::default()
    };

    let user = AccountService::new(&pool)
        .create_user(
            &account.email,
            &account.first_name,
            &account.last_name,
            account.password.as_deref(),
            extra,
        )
        .await?;

    report(&user, account.password.is_some());
    Ok(())
}

/// Create an administrator account.
///
/// # Errors
///
/// Returns an error if the email is invalid or already registered.
pub async fn create_superuser(account: &NewAccount) -> Result<(), CommandError> {
    let pool = connect().await?;

    let user = AccountService::new(&pool)
        .create_superuser(
            &account.email,
            &account.first_name,
            &account.last_name,
            account.password.as_deref(),
            ExtraFields::default(),
        )
        .await?;

    report(&user, account.password.is_some());
    Ok(())
}

fn report(user: &User, has_password: bool) {
    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Staff: {}, Superuser: {}",
        user.id,
        user.email,
        user.is_staff,
        user.is_superuser
    );
    if !has_password {
        tracing::warn!("No password set (ENF_PASSWORD). The account cannot log in yet.");
    }
}
