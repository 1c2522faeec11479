//! Route guard middleware for Axum.
//!
//! Runs before any page is served and redirects on the presence or absence
//! of a credential signal: the access-token cookie or an
//! `Authorization: Bearer` header.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use clinic_portal_platform_access::{GuardDecision, RouteGuard};
use std::sync::Arc;
use tracing::debug;

/// Guards every request passing through the layer.
pub async fn route_guard(
    State(guard): State<Arc<RouteGuard>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let decision = {
        let config = guard.config();
        let access = jar
            .get(&config.access_cookie)
            .map(|cookie| cookie.value())
            .or_else(|| bearer_token(request.headers()));
        let profile = config
            .profile_cookie
            .as_deref()
            .and_then(|name| jar.get(name))
            .map(|cookie| cookie.value());

        guard.decide(
            request.uri().path(),
            guard.credential_present(access, profile),
        )
    };

    match decision {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect(target) => {
            debug!(path = %request.uri().path(), %target, "Route guard redirect");
            Redirect::to(&target).into_response()
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{StatusCode, header},
        middleware,
        routing::get,
    };
    use clinic_portal_platform_access::GuardConfig;
    use tower::ServiceExt;

    fn app(config: GuardConfig) -> Router {
        Router::new()
            .route("/", get(|| async { "landing" }))
            .route("/signin", get(|| async { "sign in" }))
            .route("/dashboard/patients", get(|| async { "patients" }))
            .layer(middleware::from_fn_with_state(
                Arc::new(RouteGuard::new(config)),
                route_guard,
            ))
    }

    async fn get_with(app: Router, uri: &str, header: Option<(&str, &str)>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some((name, value)) = header {
            request = request.header(name, value);
        }
        app.oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("response")
    }

    fn location(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn protected_page_without_cookie_redirects_to_sign_in() {
        let response = get_with(app(GuardConfig::default()), "/dashboard/patients", None).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/signin"));
    }

    #[tokio::test]
    async fn protected_page_with_cookie_is_served() {
        let response = get_with(
            app(GuardConfig::default()),
            "/dashboard/patients",
            Some(("cookie", "accessToken=abc")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_page_with_bearer_header_is_served() {
        let response = get_with(
            app(GuardConfig::default()),
            "/dashboard/patients",
            Some(("authorization", "Bearer abc")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_cookie_is_no_credential() {
        let response = get_with(
            app(GuardConfig::default()),
            "/dashboard/patients",
            Some(("cookie", "accessToken=")),
        )
        .await;

        assert_eq!(location(&response), Some("/signin"));
    }

    #[tokio::test]
    async fn sign_in_with_cookie_redirects_home() {
        let response = get_with(
            app(GuardConfig::default()),
            "/signin",
            Some(("cookie", "accessToken=abc")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/dashboard"));
    }

    #[tokio::test]
    async fn sign_in_without_cookie_is_served() {
        let response = get_with(app(GuardConfig::default()), "/signin", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn public_page_is_always_served() {
        let response = get_with(app(GuardConfig::default()), "/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn configured_profile_cookie_is_required() {
        let config = GuardConfig {
            profile_cookie: Some("user".to_string()),
            ..GuardConfig::default()
        };

        let response = get_with(
            app(config.clone()),
            "/dashboard/patients",
            Some(("cookie", "accessToken=abc")),
        )
        .await;
        assert_eq!(location(&response), Some("/signin"));

        let response = get_with(
            app(config),
            "/dashboard/patients",
            Some(("cookie", "accessToken=abc; user=u-3")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
