//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Allowed hosts (400 for unknown `Host`)
//! 5. Security headers (frame options, HSTS, nosniff by profile)
//! 6. Session layer (tower-sessions with `PostgreSQL` store)
//! 7. Origin check (403 for cross-site form posts)
//! 8. Rate limiting on auth and cart routes (governor)

pub mod auth;
pub mod cart;
pub mod hosts;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use cart::CurrentCart;
pub use hosts::{allowed_hosts_middleware, origin_check_middleware};
pub use rate_limit::{auth_rate_limiter, cart_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, set_flash, take_flash};
