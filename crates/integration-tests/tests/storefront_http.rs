//! End-to-end tests against a running storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database at `DATABASE_URL`
//! - The storefront running (cargo run -p enf-storefront)
//!
//! `STOREFRONT_BASE_URL` defaults to `http://localhost:8000`.

use reqwest::{Client, StatusCode, header};
use rust_decimal_macros::dec;

use enf_integration_tests::{seed_product, storefront_base_url, test_pool, unique};

/// A client that keeps the session cookie and does not follow redirects.
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Form posts must come from the storefront's own origin.
fn origin() -> String {
    storefront_base_url()
}

#[tokio::test]
#[ignore = "Requires running storefront and PostgreSQL"]
async fn test_health_endpoints() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront and PostgreSQL"]
async fn test_security_headers_present() {
    let resp = client()
        .get(format!("{}/", storefront_base_url()))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(
        headers.get(header::X_FRAME_OPTIONS).map(|v| v.as_bytes()),
        Some(&b"DENY"[..])
    );
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "Requires running storefront and PostgreSQL"]
async fn test_cart_persists_across_requests() {
    let pool = test_pool().await;
    let product = seed_product(&pool, dec!(11.00)).await;
    let client = client();
    let base_url = storefront_base_url();

    for _ in 0..2 {
        let resp = client
            .post(format!("{base_url}/cart/add"))
            .header(header::ORIGIN, origin())
            .header("HX-Request", "true")
            .form(&[
                ("product_id", product.product_id.to_string()),
                ("size_id", product.product_size_id.to_string()),
                ("quantity", "2".to_string()),
            ])
            .send()
            .await
            .expect("Request failed");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("HX-Trigger").map(|v| v.as_bytes()),
            Some(&b"cart-updated"[..])
        );
    }

    let count = client
        .get(format!("{base_url}/cart/count"))
        .send()
        .await
        .expect("Request failed")
        .text()
        .await
        .expect("Failed to read body");
    assert!(count.contains('4'), "unexpected badge: {count}");
}

#[tokio::test]
#[ignore = "Requires running storefront and PostgreSQL"]
async fn test_cross_site_post_rejected() {
    let resp = client()
        .post(format!("{}/cart/clear", storefront_base_url()))
        .header(header::ORIGIN, "https://evil.example")
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running storefront and PostgreSQL"]
async fn test_checkout_requires_login() {
    let resp = client()
        .get(format!("{}/checkout", storefront_base_url()))
        .send()
        .await
        .expect("Request failed");

    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(location.starts_with("/account/login?next="), "{location}");
}

#[tokio::test]
#[ignore = "Requires running storefront and PostgreSQL"]
async fn test_register_login_and_view_account() {
    let client = client();
    let base_url = storefront_base_url();
    let email = format!("{}@example.com", unique("http"));

    let resp = client
        .post(format!("{base_url}/account/register"))
        .header(header::ORIGIN, origin())
        .form(&[
            ("email", email.as_str()),
            ("first_name", "Katherine"),
            ("last_name", "Johnson"),
            ("password", "orbital-mechanics"),
            ("password_confirm", "orbital-mechanics"),
        ])
        .send()
        .await
        .expect("Request failed");
    assert!(resp.status().is_redirection());

    let resp = client
        .get(format!("{base_url}/account"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains(&email.to_lowercase()));

    let resp = client
        .post(format!("{base_url}/account/logout"))
        .header(header::ORIGIN, origin())
        .send()
        .await
        .expect("Request failed");
    assert!(resp.status().is_redirection());

    let resp = client
        .post(format!("{base_url}/account/login"))
        .header(header::ORIGIN, origin())
        .form(&[("email", email.as_str()), ("password", "wrong")])
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Invalid email or password"));
}
