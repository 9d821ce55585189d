//! HTML form types and their validation.
//!
//! Forms deserialize every field as a plain string so a rejected submission
//! can be re-rendered exactly as typed. `validate` returns either the clean
//! domain value or per-field error messages. Free-text fields have markup
//! stripped instead of being rejected for it.

use std::collections::BTreeMap;

use serde::Deserialize;

use enf_core::checkout::{Address, ContactDetails};
use enf_core::text::{clean_optional, strip_tags};
use enf_core::{Email, EmailError};

use crate::db::users::ProfileUpdate;
use crate::models::User;

const REQUIRED: &str = "This field is required.";

/// Minimum password length for new accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    /// Record an error for a field (the first one wins).
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// The error for a field, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether no field has an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fields with errors, in name order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

/// Strip markup and whitespace; `REQUIRED` if nothing is left.
fn required(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    max: usize,
) -> String {
    let cleaned = strip_tags(value).trim().to_owned();
    if cleaned.is_empty() {
        errors.add(field, REQUIRED);
    } else {
        check_length(errors, field, &cleaned, max);
    }
    cleaned
}

/// Strip markup and whitespace; blank becomes `None`.
fn optional(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    max: usize,
) -> Option<String> {
    let cleaned = clean_optional(Some(value));
    if let Some(v) = &cleaned {
        check_length(errors, field, v, max);
    }
    cleaned
}

fn check_length(errors: &mut FieldErrors, field: &'static str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

fn email_field(errors: &mut FieldErrors, value: &str) -> Option<Email> {
    match Email::parse(value) {
        Ok(email) => Some(email),
        Err(EmailError::Empty) => {
            errors.add("email", REQUIRED);
            None
        }
        Err(_) => {
            errors.add("email", "Enter a valid email address.");
            None
        }
    }
}

/// Limits that differ between the order and profile address fields.
struct AddressLimits {
    address: usize,
    phone: usize,
}

const COMPANY_MAX: usize = 100;
const REGION_MAX: usize = 100;
const POSTAL_CODE_MAX: usize = 20;

/// Raw address fields shared by the checkout and profile forms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddressFields {
    pub company: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub country: String,
    pub province: String,
    pub postal_code: String,
    pub phone: String,
}

impl AddressFields {
    fn validate(&self, errors: &mut FieldErrors, limits: &AddressLimits) -> Address {
        Address {
            company: optional(errors, "company", &self.company, COMPANY_MAX),
            address1: optional(errors, "address1", &self.address1, limits.address),
            address2: optional(errors, "address2", &self.address2, limits.address),
            city: optional(errors, "city", &self.city, REGION_MAX),
            country: optional(errors, "country", &self.country, REGION_MAX),
            province: optional(errors, "province", &self.province, REGION_MAX),
            postal_code: optional(errors, "postal_code", &self.postal_code, POSTAL_CODE_MAX),
            phone: optional(errors, "phone", &self.phone, limits.phone),
        }
    }

    fn from_address(address: &Address) -> Self {
        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            company: value(&address.company),
            address1: value(&address.address1),
            address2: value(&address.address2),
            city: value(&address.city),
            country: value(&address.country),
            province: value(&address.province),
            postal_code: value(&address.postal_code),
            phone: value(&address.phone),
        }
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Checkout form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(flatten)]
    pub address: AddressFields,
    pub special_instructions: String,
}

impl OrderForm {
    const NAME_MAX: usize = 50;
    const LIMITS: AddressLimits = AddressLimits {
        address: 255,
        phone: 15,
    };

    /// Initial values taken from the user's profile.
    #[must_use]
    pub fn prefill(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.to_string(),
            address: AddressFields::from_address(&user.address),
            special_instructions: String::new(),
        }
    }

    /// Validate and clean the submission.
    ///
    /// # Errors
    ///
    /// Returns the per-field errors if any field is invalid.
    pub fn validate(&self) -> Result<ContactDetails, FieldErrors> {
        let mut errors = FieldErrors::default();

        let first_name = required(&mut errors, "first_name", &self.first_name, Self::NAME_MAX);
        let last_name = required(&mut errors, "last_name", &self.last_name, Self::NAME_MAX);
        let email = email_field(&mut errors, &self.email);
        let address = self.address.validate(&mut errors, &Self::LIMITS);
        let special_instructions = clean_optional(Some(&self.special_instructions));

        match email {
            Some(email) if errors.is_empty() => Ok(ContactDetails {
                first_name,
                last_name,
                email,
                address,
                special_instructions,
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// Profile edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    #[serde(flatten)]
    pub address: AddressFields,
}

impl ProfileForm {
    const NAME_MAX: usize = 50;
    const LIMITS: AddressLimits = AddressLimits {
        address: 255,
        phone: 150,
    };

    /// Current values of a user's profile.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            address: AddressFields::from_address(&user.address),
        }
    }

    /// Validate and clean the submission.
    ///
    /// # Errors
    ///
    /// Returns the per-field errors if any field is invalid.
    pub fn validate(&self) -> Result<ProfileUpdate, FieldErrors> {
        let mut errors = FieldErrors::default();

        let first_name = required(&mut errors, "first_name", &self.first_name, Self::NAME_MAX);
        let last_name = required(&mut errors, "last_name", &self.last_name, Self::NAME_MAX);
        let address = self.address.validate(&mut errors, &Self::LIMITS);

        if errors.is_empty() {
            Ok(ProfileUpdate {
                first_name,
                last_name,
                address,
            })
        } else {
            Err(errors)
        }
    }
}

/// A validated registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Registration form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
}

impl RegisterForm {
    /// Validate the submission.
    ///
    /// # Errors
    ///
    /// Returns the per-field errors if any field is invalid.
    pub fn validate(&self) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::default();

        let email = email_field(&mut errors, &self.email);
        let first_name = required(&mut errors, "first_name", &self.first_name, 50);
        let last_name = required(&mut errors, "last_name", &self.last_name, 50);

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters."),
            );
        }
        if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords do not match.");
        }

        match email {
            Some(email) if errors.is_empty() => Ok(Registration {
                email,
                first_name,
                last_name,
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Login form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Local path to return to after login.
    pub next: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order_form() -> OrderForm {
        OrderForm {
            first_name: "Ivan".to_owned(),
            last_name: "Petrov".to_owned(),
            email: "ivan@example.com".to_owned(),
            ..OrderForm::default()
        }
    }

    #[test]
    fn test_order_form_minimal_is_valid() {
        let contact = order_form().validate().unwrap();
        assert_eq!(contact.first_name, "Ivan");
        assert_eq!(contact.email.as_str(), "ivan@example.com");
        assert_eq!(contact.address, Address::default());
        assert_eq!(contact.special_instructions, None);
    }

    #[test]
    fn test_order_form_required_fields() {
        let errors = OrderForm::default().validate().unwrap_err();
        assert_eq!(errors.get("first_name"), Some(REQUIRED));
        assert_eq!(errors.get("last_name"), Some(REQUIRED));
        assert_eq!(errors.get("email"), Some(REQUIRED));
        assert_eq!(errors.get("city"), None);
    }

    #[test]
    fn test_order_form_markup_only_name_is_blank() {
        let mut form = order_form();
        form.first_name = "<b></b>".to_owned();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("first_name"), Some(REQUIRED));
    }

    #[test]
    fn test_order_form_invalid_email() {
        let mut form = order_form();
        form.email = "ivan-at-example".to_owned();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Enter a valid email address."));
    }

    #[test]
    fn test_order_form_length_limits() {
        let mut form = order_form();
        form.address.phone = "+7 999 123-45-67-89".to_owned();
        form.address.postal_code = "1".repeat(21);
        form.address.address1 = "a".repeat(255);
        let errors = form.validate().unwrap_err();
        assert!(errors.get("phone").is_some());
        assert!(errors.get("postal_code").is_some());
        assert!(errors.get("address1").is_none());
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["phone", "postal_code"]);
    }

    #[test]
    fn test_order_form_strips_markup() {
        let mut form = order_form();
        form.address.city = "<script>x</script>Kazan".to_owned();
        form.special_instructions = "  <i>ring twice</i> ".to_owned();
        let contact = form.validate().unwrap();
        assert_eq!(contact.address.city.as_deref(), Some("xKazan"));
        assert_eq!(contact.special_instructions.as_deref(), Some("ring twice"));
    }

    #[test]
    fn test_profile_form_allows_long_phone() {
        let form = ProfileForm {
            first_name: "Anna".to_owned(),
            last_name: "Ivanova".to_owned(),
            address: AddressFields {
                phone: "8".repeat(40),
                ..AddressFields::default()
            },
        };
        let update = form.validate().unwrap();
        assert_eq!(update.address.phone.map(|p| p.len()), Some(40));
    }

    #[test]
    fn test_register_form_checks_passwords() {
        let form = RegisterForm {
            email: "new@example.com".to_owned(),
            first_name: "New".to_owned(),
            last_name: "Buyer".to_owned(),
            password: "short".to_owned(),
            password_confirm: "other".to_owned(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("password").is_some());
        assert_eq!(errors.get("password_confirm"), Some("Passwords do not match."));
    }

    #[test]
    fn test_register_form_valid() {
        let form = RegisterForm {
            email: "New@Example.com".to_owned(),
            first_name: "New".to_owned(),
            last_name: "Buyer".to_owned(),
            password: "long-enough-password".to_owned(),
            password_confirm: "long-enough-password".to_owned(),
        };
        let registration = form.validate().unwrap();
        assert_eq!(registration.email.as_str(), "New@example.com");
    }

    #[test]
    fn test_order_form_deserializes_flat_fields() {
        let form: OrderForm =
            serde_json::from_str(r#"{"first_name":"A","last_name":"B","email":"a@b.io","city":"Omsk"}"#)
                .unwrap();
        assert_eq!(form.address.city, "Omsk");
        assert_eq!(form.address.phone, "");
    }
}
