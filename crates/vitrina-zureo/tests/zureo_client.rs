//! Integration tests for `ZureoClient` against a local `wiremock` server.
//!
//! Covers the session (login header, token reuse, 401 re-login), the paged
//! fetch loop (termination, 429 retry, exhaustion) and the error variants a
//! sync run can see.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitrina_core::ZureoCredentials;
use vitrina_zureo::{ZureoClient, ZureoError, ZureoSettings};

/// `base64("user:pass:acme.uy")`
const EXPECTED_BASIC: &str = "Basic dXNlcjpwYXNzOmFjbWUudXk=";
const LOGIN_PATH: &str = "/sdk/v1/security/login";
const PRODUCTS_PATH: &str = "/sdk/v1/product/all";

fn credentials() -> ZureoCredentials {
    ZureoCredentials {
        username: "user".to_owned(),
        password: "pass".to_owned(),
        domain: "acme.uy".to_owned(),
        company_id: "7".to_owned(),
    }
}

fn test_client(server: &MockServer, page_size: u32, max_retries: u32) -> ZureoClient {
    ZureoClient::with_base_url(
        credentials(),
        ZureoSettings::immediate(page_size, max_retries),
        &server.uri(),
    )
    .expect("failed to build test ZureoClient")
}

fn login_ok(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "token": token,
        "valid_to": "2099-01-01T00:00:00Z"
    }))
}

async fn mount_login(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(header("authorization", EXPECTED_BASIC))
        .respond_with(login_ok("tok-1"))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn product_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "codigo": format!("P{id}"),
        "nombre": format!("Producto {id}"),
        "precio": 100.0,
        "impuesto": 1.22,
        "stock": 1,
        "tipo": "Remeras",
        "marca": "acme",
        "variedades": null
    })
}

fn page(ids: &[i64]) -> ResponseTemplate {
    let data: Vec<_> = ids.iter().copied().map(product_json).collect();
    ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_sends_composite_basic_auth_and_caches_token() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    let client = test_client(&server, 10, 0);
    let first = client.valid_token().await.expect("first token");
    let second = client.valid_token().await.expect("second token");

    assert_eq!(first, "tok-1");
    assert_eq!(second, "tok-1");
}

#[tokio::test]
async fn data_calls_reuse_one_login() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(page(&[1]))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    client.fetch_products_page(0, 10).await.expect("page 1");
    client.fetch_products_page(0, 10).await.expect("page 2");
}

#[tokio::test]
async fn login_rejection_is_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let result = client.fetch_all_products(10).await;

    match result {
        Err(ZureoError::Authentication { status, body }) => {
            assert_eq!(status, 403);
            assert!(body.contains("bad credentials"));
        }
        other => panic!("expected Authentication, got: {other:?}"),
    }
}

#[tokio::test]
async fn login_without_token_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid_to": 0 })))
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let result = client.valid_token().await;
    assert!(
        matches!(result, Err(ZureoError::MalformedResponse { .. })),
        "expected MalformedResponse, got: {result:?}"
    );
}

#[tokio::test]
async fn unauthorized_data_call_triggers_relogin_once() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .respond_with(page(&[1]))
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let products = client.fetch_products_page(0, 10).await.expect("retry after re-login");
    assert_eq!(products.len(), 1);
}

#[tokio::test]
async fn repeated_unauthorized_is_authentication_error() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let result = client.fetch_products_page(0, 10).await;
    assert!(
        matches!(result, Err(ZureoError::Authentication { status: 401, .. })),
        "expected Authentication 401, got: {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_all_sends_company_and_paging_params() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("emp", "7"))
        .and(query_param("from", "0"))
        .and(query_param("qty", "50"))
        .respond_with(page(&[1, 2]))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 50, 0);
    let products = client.fetch_all_products(50).await.expect("single page");
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].code, "P1");
    assert_eq!(products[0].raw["codigo"], "P1");
}

#[tokio::test]
async fn fetch_all_walks_offsets_until_empty_page() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    for (from, ids) in [("0", vec![1, 2]), ("2", vec![3, 4]), ("4", vec![])] {
        Mock::given(method("GET"))
            .and(path(PRODUCTS_PATH))
            .and(query_param("from", from))
            .respond_with(page(&ids))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = test_client(&server, 2, 0);
    let products = client.fetch_all_products(2).await.expect("three pages");

    let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn fetch_all_stops_on_short_page() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("from", "0"))
        .respond_with(page(&[1, 2]))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("from", "2"))
        .respond_with(page(&[3]))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 2, 0);
    let products = client.fetch_all_products(2).await.expect("two pages");
    assert_eq!(products.len(), 3);
}

#[tokio::test]
async fn null_first_page_is_malformed() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let err = client
        .fetch_all_products(10)
        .await
        .expect_err("an empty first page must not read as an empty catalog");
    match err {
        ZureoError::MalformedResponse { context, .. } => {
            assert_eq!(context, "product/all from=0");
        }
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_first_page_is_malformed() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .respond_with(page(&[]))
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let result = client.fetch_all_products(10).await;
    assert!(matches!(result, Err(ZureoError::MalformedResponse { .. })));
}

#[tokio::test]
async fn null_later_page_ends_the_catalog() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("from", "0"))
        .respond_with(page(&[1, 2]))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("from", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .mount(&server)
        .await;

    let client = test_client(&server, 2, 0);
    let products = client.fetch_all_products(2).await.expect("two products");
    assert_eq!(products.len(), 2);
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rate_limited_page_is_retried_without_duplicates() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("from", "2"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("from", "0"))
        .respond_with(page(&[1, 2]))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("from", "2"))
        .respond_with(page(&[3]))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 2, 3);
    let products = client.fetch_all_products(2).await.expect("retry succeeds");

    let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn persistent_rate_limit_is_exhausted() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 2);
    let result = client.fetch_all_products(10).await;

    match result {
        Err(ZureoError::RateLimitExhausted { offset, attempts }) => {
            assert_eq!(offset, 0);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected RateLimitExhausted, got: {other:?}"),
    }
}

#[tokio::test]
async fn single_page_fetch_surfaces_rate_limited() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let result = client.fetch_products_page(0, 10).await;
    assert!(
        matches!(result, Err(ZureoError::RateLimited { .. })),
        "expected RateLimited, got: {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_body_aborts_fetch() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let result = client.fetch_all_products(10).await;
    assert!(
        matches!(result, Err(ZureoError::MalformedResponse { .. })),
        "expected MalformedResponse, got: {result:?}"
    );
}

#[tokio::test]
async fn failure_on_later_page_discards_earlier_pages() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("from", "0"))
        .respond_with(page(&[1, 2]))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("from", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server, 2, 0);
    let result = client.fetch_all_products(2).await;
    assert!(
        matches!(result, Err(ZureoError::MalformedResponse { .. })),
        "expected MalformedResponse, got: {result:?}"
    );
}

#[tokio::test]
async fn server_error_is_unexpected_status() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let result = client.fetch_all_products(10).await;

    match result {
        Err(ZureoError::UnexpectedStatus {
            status,
            context,
            body,
        }) => {
            assert_eq!(status, 500);
            assert!(context.contains("from=0"), "context was {context}");
            assert_eq!(body, "boom");
        }
        other => panic!("expected UnexpectedStatus, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_product_images_passes_product_and_variety() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/sdk/v1/product/image"))
        .and(query_param("id", "10"))
        .and(query_param("var", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "base64": "aGVsbG8=", "filename": "front.jpg", "descripcion": "Frente" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let images = client
        .fetch_product_images(10, Some(3))
        .await
        .expect("images");

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].base64, "aGVsbG8=");
    assert_eq!(images[0].filename.as_deref(), Some("front.jpg"));
    assert_eq!(images[0].description.as_deref(), Some("Frente"));
}

#[tokio::test]
async fn fetch_product_images_without_variety_omits_var() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/sdk/v1/product/image"))
        .and(query_param("id", "10"))
        .and(wiremock::matchers::query_param_is_missing("var"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 10, 0);
    let images = client.fetch_product_images(10, None).await.expect("images");
    assert!(images.is_empty());
}
