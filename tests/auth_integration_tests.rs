mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use common::*;
use laundry_hub::{
    AppState,
    auth::{self, USER_ID_HEADER, USER_ROLE_HEADER},
    create_router,
    error::ErrorBody,
    roles::Role,
};
use tower::ServiceExt;
use uuid::Uuid;

// --- Helpers ---

async fn send(state: &AppState, request: Request<Body>) -> Response {
    create_router(state.clone())
        .oneshot(request)
        .await
        .expect("router is infallible")
}

fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

async fn get_as(state: &AppState, uri: &str, role: Role) -> Response {
    let user = seed_user(state, role).await;
    let token = auth::issue_session_token(user.id, &state.config).unwrap();
    let request = get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(state, request).await
}

async fn error_body(response: Response) -> ErrorBody {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("error responses are JSON")
}

fn trusting_context() -> TestContext {
    create_test_context_with(laundry_hub::config::AppConfig {
        trust_identity_headers: true,
        ..test_config()
    })
}

// --- Gate: anonymous callers ---

#[tokio::test]
async fn anonymous_callers_get_401_on_protected_prefixes() {
    let ctx = create_test_context();
    for uri in ["/customer/me", "/admin/store/orders", "/admin/franchise/stores", "/admin/super/stats"] {
        let response = send(&ctx.state, get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body = error_body(response).await;
        assert_eq!(body.error, "unauthenticated");
        assert_eq!(body.message, "authentication required");
    }
}

#[tokio::test]
async fn public_routes_need_no_credentials() {
    let ctx = create_test_context();
    for uri in ["/health", "/stores", "/services"] {
        let response = send(&ctx.state, get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

// --- Gate: role table ---

#[tokio::test]
async fn super_console_admits_only_super_admins() {
    let ctx = create_test_context();

    let denied = get_as(&ctx.state, "/admin/super/stats", Role::FranchiseAdmin).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    let body = error_body(denied).await;
    assert_eq!(body.error, "forbidden");
    assert_eq!(body.message, "access denied");

    let allowed = get_as(&ctx.state, "/admin/super/stats", Role::SuperAdmin).await;
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn store_console_admits_staff_roles() {
    let ctx = create_test_context();
    for role in [Role::StoreAdmin, Role::FranchiseAdmin, Role::SuperAdmin] {
        let response = get_as(&ctx.state, "/admin/store/orders", role).await;
        assert_eq!(response.status(), StatusCode::OK, "{role}");
    }
    for role in [Role::Customer, Role::Rider] {
        let response = get_as(&ctx.state, "/admin/store/orders", role).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{role}");
    }
}

#[tokio::test]
async fn customer_area_passes_the_gate_for_any_role() {
    let ctx = create_test_context();
    // /customer/me has no handler-level role check.
    for role in Role::ALL {
        let response = get_as(&ctx.state, "/customer/me", role).await;
        assert_eq!(response.status(), StatusCode::OK, "{role}");
    }
    // Handlers still narrow the address book to customers.
    let response = get_as(&ctx.state, "/customer/addresses", Role::StoreAdmin).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn rider_routes_are_guarded_per_route() {
    let ctx = create_test_context();

    let anonymous = send(&ctx.state, get("/rider/orders").body(Body::empty()).unwrap()).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let super_admin = get_as(&ctx.state, "/rider/orders", Role::SuperAdmin).await;
    assert_eq!(super_admin.status(), StatusCode::FORBIDDEN);

    let rider = get_as(&ctx.state, "/rider/orders", Role::Rider).await;
    assert_eq!(rider.status(), StatusCode::OK);
}

// --- Session tokens ---

#[tokio::test]
async fn session_cookie_is_accepted() {
    let ctx = create_test_context();
    let user = seed_user(&ctx.state, Role::Customer).await;
    let token = auth::issue_session_token(user.id, &ctx.state.config).unwrap();

    let request = get("/customer/me")
        .header(header::COOKIE, format!("theme=dark; session={token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&ctx.state, request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn forged_and_foreign_tokens_are_anonymous() {
    let ctx = create_test_context();
    let user = seed_user(&ctx.state, Role::SuperAdmin).await;

    let mut other_config = test_config();
    other_config.session_secret = "a-different-secret".to_string();
    let foreign = auth::issue_session_token(user.id, &other_config).unwrap();
    let unknown_user = auth::issue_session_token(Uuid::new_v4(), &ctx.state.config).unwrap();

    for token in ["not.a.token".to_string(), foreign, unknown_user] {
        let request = get("/admin/super/stats")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&ctx.state, request).await.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn deactivated_accounts_lose_their_sessions() {
    let ctx = create_test_context();
    let user = seed_user(&ctx.state, Role::Customer).await;
    let token = auth::issue_session_token(user.id, &ctx.state.config).unwrap();
    ctx.state.repo.set_user_active(user.id, false).await.unwrap();

    let request = get("/customer/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&ctx.state, request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_changes_apply_to_existing_sessions() {
    let ctx = create_test_context();
    let user = seed_user(&ctx.state, Role::SuperAdmin).await;
    let token = auth::issue_session_token(user.id, &ctx.state.config).unwrap();
    ctx.state.repo.set_user_role(user.id, Role::Customer).await.unwrap();

    let request = get("/admin/super/stats")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&ctx.state, request).await.status(), StatusCode::FORBIDDEN);
}

// --- Trusted identity headers ---

#[tokio::test]
async fn identity_headers_are_ignored_unless_trusted() {
    let ctx = create_test_context();
    let user = seed_user(&ctx.state, Role::SuperAdmin).await;

    let request = get("/admin/super/stats")
        .header(USER_ID_HEADER, user.id.to_string())
        .header(USER_ROLE_HEADER, "SUPER_ADMIN")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&ctx.state, request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn trusted_headers_with_unknown_role_are_forbidden_at_the_gate() {
    let ctx = trusting_context();
    let user = seed_user(&ctx.state, Role::Customer).await;

    for role in ["", "JANITOR", "customer"] {
        let request = get("/customer/me")
            .header(USER_ID_HEADER, user.id.to_string())
            .header(USER_ROLE_HEADER, role)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&ctx.state, request).await.status(), StatusCode::FORBIDDEN, "{role:?}");
    }
}

#[tokio::test]
async fn trusted_headers_without_a_role_are_forbidden_at_the_gate() {
    let ctx = trusting_context();
    let user = seed_user(&ctx.state, Role::Customer).await;

    let request = get("/customer/me")
        .header(USER_ID_HEADER, user.id.to_string())
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&ctx.state, request).await.status(), StatusCode::FORBIDDEN);

    let unknown = get("/customer/me")
        .header(USER_ID_HEADER, Uuid::new_v4().to_string())
        .header(USER_ROLE_HEADER, "CUSTOMER")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&ctx.state, unknown).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn trusted_headers_are_ignored_outside_the_customer_area() {
    let ctx = trusting_context();
    let customer_id = seed_user(&ctx.state, Role::Customer).await.id;
    let super_id = seed_user(&ctx.state, Role::SuperAdmin).await.id;
    let rider_id = seed_user(&ctx.state, Role::Rider).await.id;

    for (uri, user_id, role) in [
        ("/admin/super/stats", customer_id, "SUPER_ADMIN"),
        ("/admin/super/stats", super_id, "SUPER_ADMIN"),
        ("/admin/store/orders", customer_id, "STORE_ADMIN"),
        ("/rider/orders", rider_id, "RIDER"),
    ] {
        let request = get(uri)
            .header(USER_ID_HEADER, user_id.to_string())
            .header(USER_ROLE_HEADER, role)
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            send(&ctx.state, request).await.status(),
            StatusCode::UNAUTHORIZED,
            "{uri} as {role}"
        );
    }
}

#[tokio::test]
async fn asserted_role_never_outranks_the_stored_role() {
    let ctx = trusting_context();
    let customer = seed_user(&ctx.state, Role::Customer).await;
    let super_admin = seed_user(&ctx.state, Role::SuperAdmin).await;
    let rider = seed_user(&ctx.state, Role::Rider).await;

    let as_headers = |user_id: Uuid, role: &str| {
        get("/customer/addresses")
            .header(USER_ID_HEADER, user_id.to_string())
            .header(USER_ROLE_HEADER, role)
            .body(Body::empty())
            .unwrap()
    };

    let escalated = send(&ctx.state, as_headers(customer.id, "SUPER_ADMIN")).await;
    assert_eq!(escalated.status(), StatusCode::FORBIDDEN);
    let sideways = send(&ctx.state, as_headers(rider.id, "CUSTOMER")).await;
    assert_eq!(sideways.status(), StatusCode::FORBIDDEN);

    // Narrowing is allowed: a super admin acting as a customer reaches the address book.
    let narrowed = send(&ctx.state, as_headers(super_admin.id, "CUSTOMER")).await;
    assert_eq!(narrowed.status(), StatusCode::OK);
    let matching = send(&ctx.state, as_headers(customer.id, "CUSTOMER")).await;
    assert_eq!(matching.status(), StatusCode::OK);
}

// --- Observability ---

#[tokio::test]
async fn responses_carry_a_request_id() {
    let ctx = create_test_context();
    let response = send(&ctx.state, get("/health").body(Body::empty()).unwrap()).await;
    assert!(response.headers().contains_key("x-request-id"));

    let denied = send(&ctx.state, get("/customer/me").body(Body::empty()).unwrap()).await;
    assert!(denied.headers().contains_key("x-request-id"));
}
