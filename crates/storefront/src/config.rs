//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Profile
//! - `ENF_PROFILE` - `development` (default) or `production`
//!
//! ## Database
//! - `DATABASE_URL` - `PostgreSQL` connection string, or assembled from:
//! - `POSTGRES_DB`, `POSTGRES_USER`, `POSTGRES_PASSWORD` (required without `DATABASE_URL`)
//! - `POSTGRES_HOST` (default: db), `POSTGRES_PORT` (default: 5432)
//!
//! ## Security
//! - `SECRET_KEY` - Application secret (required in production: min 32 chars, high entropy)
//! - `ALLOWED_HOSTS` - Comma-separated host names (development default: `*`)
//! - `CSRF_TRUSTED_ORIGINS` - Comma-separated origins allowed to submit forms
//!
//! ## Payments (optional)
//! - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`
//! - `HELEKET_API_KEY`, `HELEKET_SECRET_KEY`
//!
//! ## Server
//! - `ENF_HOST` - Bind address (default: 127.0.0.1)
//! - `ENF_PORT` - Listen port (default: 8000)
//! - `STATIC_ROOT` - Directory served under `/static` (default: static)
//! - `MEDIA_ROOT` - Directory served under `/media` (default: media)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Secret used when `SECRET_KEY` is unset in development.
const DEVELOPMENT_SECRET_KEY: &str = "unsafe-development-secret";

/// Session lifetime after the last request, in seconds (one day).
pub const SESSION_COOKIE_AGE_SECONDS: i64 = 86_400;

/// HSTS max-age sent in production, in seconds (one year).
pub const HSTS_MAX_AGE_SECONDS: u64 = 31_536_000;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "unsafe",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment profile selecting the security posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Local development: plain HTTP, permissive hosts, relaxed headers.
    #[default]
    Development,
    /// Public deployment behind HTTPS.
    Production,
}

impl Profile {
    /// Whether this is the production profile.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
        })
    }
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            other => Err(format!("unknown profile '{other}'")),
        }
    }
}

/// Host names the server answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedHosts {
    /// Any host (`*`).
    Any,
    /// Only these host names. A leading `.` also matches subdomains.
    List(Vec<String>),
}

impl AllowedHosts {
    fn parse(raw: &str) -> Self {
        let hosts = split_list(raw);
        if hosts.iter().any(|h| h == "*") {
            return Self::Any;
        }
        Self::List(hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect())
    }

    /// Whether a `Host` header value (port optional) is allowed.
    #[must_use]
    pub fn allows(&self, host_header: &str) -> bool {
        let Self::List(hosts) = self else {
            return true;
        };
        let host = strip_port(host_header).to_ascii_lowercase();
        hosts.iter().any(|allowed| {
            allowed.strip_prefix('.').map_or_else(
                || *allowed == host,
                |domain| host == domain || host.ends_with(allowed.as_str()),
            )
        })
    }
}

/// Payment provider credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone, Default)]
pub struct PaymentConfig {
    pub stripe_secret_key: Option<SecretString>,
    pub stripe_webhook_secret: Option<SecretString>,
    pub heleket_api_key: Option<SecretString>,
    pub heleket_secret_key: Option<SecretString>,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(value: Option<&SecretString>) -> &'static str {
            if value.is_some() { "[REDACTED]" } else { "None" }
        }

        f.debug_struct("PaymentConfig")
            .field("stripe_secret_key", &redact(self.stripe_secret_key.as_ref()))
            .field(
                "stripe_webhook_secret",
                &redact(self.stripe_webhook_secret.as_ref()),
            )
            .field("heleket_api_key", &redact(self.heleket_api_key.as_ref()))
            .field(
                "heleket_secret_key",
                &redact(self.heleket_secret_key.as_ref()),
            )
            .finish()
    }
}

/// HTTP security settings derived from the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityPolicy {
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
    /// Send `X-Content-Type-Options: nosniff`.
    pub content_type_nosniff: bool,
    /// `Strict-Transport-Security` max-age, if HSTS is enabled.
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: bool,
    pub hsts_preload: bool,
}

impl SecurityPolicy {
    /// The policy for a profile.
    #[must_use]
    pub const fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Development => Self {
                secure_cookies: false,
                content_type_nosniff: false,
                hsts_max_age: None,
                hsts_include_subdomains: false,
                hsts_preload: false,
            },
            Profile::Production => Self {
                secure_cookies: true,
                content_type_nosniff: true,
                hsts_max_age: Some(HSTS_MAX_AGE_SECONDS),
                hsts_include_subdomains: true,
                hsts_preload: true,
            },
        }
    }

    /// Value of the `Strict-Transport-Security` header, if enabled.
    #[must_use]
    pub fn hsts_header(&self) -> Option<String> {
        let max_age = self.hsts_max_age?;
        let mut value = format!("max-age={max_age}");
        if self.hsts_include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if self.hsts_preload {
            value.push_str("; preload");
        }
        Some(value)
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Deployment profile
    pub profile: Profile,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Application secret
    pub secret_key: SecretString,
    /// Host names accepted in the `Host` header
    pub allowed_hosts: AllowedHosts,
    /// Extra origins allowed to submit forms
    pub csrf_trusted_origins: Vec<String>,
    /// Payment provider credentials
    pub payments: PaymentConfig,
    /// Directory served under `/static`
    pub static_root: PathBuf,
    /// Directory served under `/media`
    pub media_root: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the production secret fails validation (placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`StorefrontConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let profile = match env.optional("ENF_PROFILE") {
            Some(raw) => raw
                .parse::<Profile>()
                .map_err(|e| ConfigError::InvalidEnvVar("ENF_PROFILE".to_string(), e))?,
            None => Profile::default(),
        };

        let database_url = get_database_url(&env)?;
        let host = env
            .or_default("ENF_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ENF_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("ENF_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ENF_PORT".to_string(), e.to_string()))?;

        let secret_key = match profile {
            Profile::Production => {
                let secret = get_validated_secret(&env, "SECRET_KEY")?;
                validate_session_secret(&secret, "SECRET_KEY")?;
                secret
            }
            Profile::Development => env.optional("SECRET_KEY").map_or_else(
                || {
                    tracing::warn!("SECRET_KEY not set, using an insecure development secret");
                    SecretString::from(DEVELOPMENT_SECRET_KEY)
                },
                SecretString::from,
            ),
        };

        let allowed_hosts = match (env.optional("ALLOWED_HOSTS"), profile) {
            (Some(raw), _) => AllowedHosts::parse(&raw),
            (None, Profile::Development) => AllowedHosts::Any,
            (None, Profile::Production) => {
                return Err(ConfigError::MissingEnvVar("ALLOWED_HOSTS".to_string()));
            }
        };

        let csrf_trusted_origins = env.optional("CSRF_TRUSTED_ORIGINS").map_or_else(
            || match profile {
                Profile::Development => vec![
                    format!("http://localhost:{port}"),
                    format!("http://127.0.0.1:{port}"),
                ],
                Profile::Production => Vec::new(),
            },
            |raw| split_list(&raw),
        );

        let payments = PaymentConfig {
            stripe_secret_key: env.optional("STRIPE_SECRET_KEY").map(SecretString::from),
            stripe_webhook_secret: env.optional("STRIPE_WEBHOOK_SECRET").map(SecretString::from),
            heleket_api_key: env.optional("HELEKET_API_KEY").map(SecretString::from),
            heleket_secret_key: env.optional("HELEKET_SECRET_KEY").map(SecretString::from),
        };

        Ok(Self {
            profile,
            database_url,
            host,
            port,
            secret_key,
            allowed_hosts,
            csrf_trusted_origins,
            payments,
            static_root: PathBuf::from(env.or_default("STATIC_ROOT", "static")),
            media_root: PathBuf::from(env.or_default("MEDIA_ROOT", "media")),
            sentry_dsn: env.optional("SENTRY_DSN"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Security settings for the configured profile.
    #[must_use]
    pub const fn security(&self) -> SecurityPolicy {
        SecurityPolicy::for_profile(self.profile)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the usual required/optional/default accessors.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

/// Get the database URL, assembling it from `POSTGRES_*` parts if needed.
fn get_database_url<F>(env: &Env<F>) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env.optional("DATABASE_URL") {
        return Ok(SecretString::from(url));
    }

    let name = env.required("POSTGRES_DB")?;
    let user = env.required("POSTGRES_USER")?;
    let password = env.required("POSTGRES_PASSWORD")?;
    let host = env.or_default("POSTGRES_HOST", "db");
    let port = env
        .or_default("POSTGRES_PORT", "5432")
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidEnvVar("POSTGRES_PORT".to_string(), e.to_string()))?;

    let mut url = url::Url::parse("postgres://localhost")
        .map_err(|e| ConfigError::InvalidEnvVar("POSTGRES_HOST".to_string(), e.to_string()))?;
    let invalid_host =
        |e: url::ParseError| ConfigError::InvalidEnvVar("POSTGRES_HOST".to_string(), e.to_string());
    url.set_host(Some(&host)).map_err(invalid_host)?;
    // Setting credentials and port cannot fail once a host is present
    let _ = url.set_username(&user);
    let _ = url.set_password(Some(&password));
    let _ = url.set_port(Some(port));
    url.set_path(&name);

    Ok(SecretString::from(url.to_string()))
}

/// Split a comma-separated list, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Drop a `:port` suffix from a host header value (IPv6 literals keep their brackets).
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret.
fn get_validated_secret<F>(env: &Env<F>, key: &str) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = env.required(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_development_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/enf")]).unwrap();
        assert_eq!(config.profile, Profile::Development);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.allowed_hosts, AllowedHosts::Any);
        assert_eq!(
            config.csrf_trusted_origins,
            vec!["http://localhost:8000", "http://127.0.0.1:8000"]
        );
        assert_eq!(config.secret_key.expose_secret(), DEVELOPMENT_SECRET_KEY);
        assert!(!config.security().secure_cookies);
        assert_eq!(config.security().hsts_header(), None);
    }

    #[test]
    fn test_database_url_from_parts() {
        let config = load(&[
            ("POSTGRES_DB", "enf"),
            ("POSTGRES_USER", "shop"),
            ("POSTGRES_PASSWORD", "p@ss"),
        ])
        .unwrap();
        assert_eq!(
            config.database_url.expose_secret(),
            "postgres://shop:p%40ss@db:5432/enf"
        );
    }

    #[test]
    fn test_database_url_missing() {
        let err = load(&[("POSTGRES_DB", "enf")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "POSTGRES_USER"));
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/enf"),
            ("ENF_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "ENF_PORT"));
    }

    #[test]
    fn test_production_requires_strong_secret() {
        let base = [
            ("ENF_PROFILE", "production"),
            ("DATABASE_URL", "postgres://localhost/enf"),
            ("ALLOWED_HOSTS", "shop.example.org"),
        ];
        assert!(matches!(
            load(&base).unwrap_err(),
            ConfigError::MissingEnvVar(_)
        ));

        let mut weak = base.to_vec();
        weak.push(("SECRET_KEY", "changeme-changeme-changeme-changeme"));
        assert!(matches!(
            load(&weak).unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));

        let mut strong = base.to_vec();
        strong.push(("SECRET_KEY", STRONG_SECRET));
        let config = load(&strong).unwrap();
        assert!(config.security().secure_cookies);
        assert!(config.security().content_type_nosniff);
        assert_eq!(
            config.security().hsts_header().as_deref(),
            Some("max-age=31536000; includeSubDomains; preload")
        );
        assert!(config.csrf_trusted_origins.is_empty());
    }

    #[test]
    fn test_production_requires_allowed_hosts() {
        let err = load(&[
            ("ENF_PROFILE", "prod"),
            ("DATABASE_URL", "postgres://localhost/enf"),
            ("SECRET_KEY", STRONG_SECRET),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "ALLOWED_HOSTS"));
    }

    #[test]
    fn test_unknown_profile() {
        let err = load(&[("ENF_PROFILE", "staging")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_allowed_hosts_matching() {
        let hosts = AllowedHosts::parse("shop.example.org, .enf.test");
        assert!(hosts.allows("shop.example.org"));
        assert!(hosts.allows("SHOP.example.org:8000"));
        assert!(hosts.allows("enf.test"));
        assert!(hosts.allows("www.enf.test"));
        assert!(!hosts.allows("evil.org"));
        assert!(!hosts.allows("notenf.test"));
        assert!(AllowedHosts::parse("*").allows("anything"));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("localhost:8000"), "localhost");
        assert_eq!(strip_port("localhost"), "localhost");
        assert_eq!(strip_port("[::1]:8000"), "[::1]");
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(validate_secret_strength("your-api-key-here", "TEST_VAR").is_err());
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").is_err());
        assert!(validate_secret_strength(STRONG_SECRET, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "TEST").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "TEST").is_ok());
    }

    #[test]
    fn test_payment_config_debug_redacts_secrets() {
        let config = PaymentConfig {
            stripe_secret_key: Some(SecretString::from("sk_live_super_secret")),
            heleket_api_key: Some(SecretString::from("heleket_super_secret")),
            ..PaymentConfig::default()
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("None"));
        assert!(!debug_output.contains("sk_live_super_secret"));
        assert!(!debug_output.contains("heleket_super_secret"));
    }
}
