//! User domain types.

use chrono::{DateTime, Utc};

use enf_core::checkout::Address;
use enf_core::{Email, UserId};

/// A shop account, identified by email.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login identity.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// Default contact and shipping details, already sanitized.
    pub address: Address,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
    /// Last successful login.
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// "First Last", skipping blank parts.
    #[must_use]
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
