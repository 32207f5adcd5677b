use std::{future::Future, io, net::SocketAddr};

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{auth, blogs, state::AppState};

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(blogs::router())
        .route("/health", get(health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

/// Resolves when `signal` fires. A listener that cannot be installed never
/// resolves, so it cannot trigger a shutdown on its own.
async fn wait_for<F>(signal: F, name: &'static str)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(err) = signal.await {
        warn!(error = ?err, signal = name, "failed to install signal handler");
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = wait_for(tokio::signal::ctrl_c(), "ctrl-c");

    #[cfg(unix)]
    let terminate = wait_for(
        async {
            let mut term = signal(SignalKind::terminate())?;
            term.recv().await;
            Ok::<(), io::Error>(())
        },
        "sigterm",
    );
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    info!("listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    serve_until(listener, app, shutdown_signal()).await
}

/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn serve_until<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
    }

    impl TestApp {
        fn new() -> Self {
            Self {
                app: build_app(AppState::fake()),
            }
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let req = match body {
                Some(body) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();

            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        async fn register(&self, name: &str, email: &str) -> String {
            let (status, body) = self
                .call(
                    Method::POST,
                    "/auth/register",
                    None,
                    Some(json!({ "name": name, "email": email, "password": "testpass" })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["token"].as_str().unwrap().to_owned()
        }

        async fn create_blog(&self, token: &str) -> String {
            let (status, body) = self
                .call(
                    Method::POST,
                    "/blogs",
                    Some(token),
                    Some(json!({
                        "title": "My First Blog",
                        "description": "This is a test blog post",
                        "tags": "test,blog"
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["_id"].as_str().unwrap().to_owned()
        }
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = TestApp::new();
        let (status, body) = app.call(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn register_then_login_never_exposes_the_hash() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "name": "Jane", "email": "jane@example.com", "password": "testpass" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["token"].is_string());
        assert_eq!(body["user"]["email"], "jane@example.com");
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["user"].get("password_hash").is_none());

        let (status, body) = app
            .call(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "jane@example.com", "password": "testpass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap();

        let (status, me) = app.call(Method::GET, "/auth/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["name"], "Jane");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = TestApp::new();
        app.register("Jane", "jane@example.com").await;
        let (status, body) = app
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "name": "Jane", "email": "jane@example.com", "password": "testpass" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email already in use");
    }

    #[tokio::test]
    async fn bad_login_is_unauthorized() {
        let app = TestApp::new();
        app.register("Jane", "jane@example.com").await;
        let (status, body) = app
            .call(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "jane@example.com", "password": "badpass" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn writes_require_a_token() {
        let app = TestApp::new();
        let (status, _) = app
            .call(
                Method::POST,
                "/blogs",
                None,
                Some(json!({ "title": "My First Blog", "description": "This is a test blog post" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .call(Method::POST, "/blogs", Some("garbage"), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_then_read_blog() {
        let app = TestApp::new();
        let token = app.register("Jane", "jane@example.com").await;
        let id = app.create_blog(&token).await;

        let (status, blog) = app
            .call(Method::GET, &format!("/blogs/{id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(blog["tags"], json!(["test", "blog"]));
        assert_eq!(blog["likes"], json!([]));
        assert_eq!(blog["comments"], json!([]));
        assert_eq!(blog["author"]["name"], "Jane");

        let (status, list) = app
            .call(Method::GET, "/blogs?tag=test&sort=title:asc", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (_, list) = app
            .call(Method::GET, "/blogs?search=nothing-matches", None, None)
            .await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn invalid_blog_reports_fields() {
        let app = TestApp::new();
        let token = app.register("Jane", "jane@example.com").await;
        let (status, body) = app
            .call(
                Method::POST,
                "/blogs",
                Some(&token),
                Some(json!({ "title": "ab", "description": "short" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["title"].is_string());
        assert!(body["errors"]["description"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = TestApp::new();
        let res = app
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_uuid_ids_are_not_found() {
        let app = TestApp::new();
        let (status, body) = app
            .call(Method::GET, "/blogs/64b7f0c2e4b0a1a2b3c4d5e6", None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Blog not found");
    }

    #[tokio::test]
    async fn like_twice_is_rejected() {
        let app = TestApp::new();
        let jane = app.register("Jane", "jane@example.com").await;
        let bob = app.register("Bob", "bob@example.com").await;
        let id = app.create_blog(&jane).await;
        let like = format!("/blogs/{id}/like");

        let (status, blog) = app.call(Method::POST, &like, Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(blog["likes"].as_array().unwrap().len(), 1);

        let (status, body) = app.call(Method::POST, &like, Some(&bob), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Already liked");

        let (status, blog) = app
            .call(Method::POST, &format!("/blogs/{id}/unlike"), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(blog["likes"], json!([]));

        let (status, body) = app
            .call(Method::POST, &format!("/blogs/{id}/unlike"), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Not liked yet");
    }

    #[tokio::test]
    async fn only_the_author_may_change_a_blog() {
        let app = TestApp::new();
        let jane = app.register("Jane", "jane@example.com").await;
        let bob = app.register("Bob", "bob@example.com").await;
        let id = app.create_blog(&jane).await;
        let path = format!("/blogs/{id}");

        let (status, _) = app
            .call(Method::PUT, &path, Some(&bob), Some(json!({ "title": "Hijacked" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, blog) = app
            .call(Method::PUT, &path, Some(&jane), Some(json!({ "title": "New Title" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(blog["title"], "New Title");
        assert_eq!(blog["description"], "This is a test blog post");

        let (status, _) = app.call(Method::DELETE, &path, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app.call(Method::DELETE, &path, Some(&jane), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Deleted");

        let (status, _) = app.call(Method::GET, &path, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn comment_lifecycle() {
        let app = TestApp::new();
        let jane = app.register("Jane", "jane@example.com").await;
        let bob = app.register("Bob", "bob@example.com").await;
        let id = app.create_blog(&jane).await;

        let (status, blog) = app
            .call(
                Method::POST,
                &format!("/blogs/{id}/comments"),
                Some(&bob),
                Some(json!({ "text": "Nice post!" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(blog["comments"].as_array().unwrap().len(), 1);
        assert_eq!(blog["comments"][0]["user"]["name"], "Bob");
        let comment_id = blog["comments"][0]["_id"].as_str().unwrap();

        let (status, blog) = app
            .call(
                Method::DELETE,
                &format!("/blogs/{id}/comments/{comment_id}"),
                Some(&jane),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(blog["comments"], json!([]));
    }

    #[tokio::test]
    async fn failed_signal_handler_never_triggers_shutdown() {
        let failing = wait_for(
            async { Err::<(), _>(io::Error::new(io::ErrorKind::Other, "no handler")) },
            "test",
        );
        let waited = tokio::time::timeout(std::time::Duration::from_millis(50), failing).await;
        assert!(waited.is_err());

        let firing = wait_for(async { Ok::<(), io::Error>(()) }, "test");
        tokio::time::timeout(std::time::Duration::from_millis(50), firing)
            .await
            .expect("signal should resolve");
    }

    #[tokio::test]
    async fn server_stops_once_shutdown_fires() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(
            listener,
            build_app(AppState::fake()),
            async move {
                let _ = rx.await;
            },
        ));

        tx.send(()).unwrap();
        let finished = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .expect("server should drain and stop");
        finished.unwrap().unwrap();
    }
}
