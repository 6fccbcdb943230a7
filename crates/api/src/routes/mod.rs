pub mod booking;
pub mod events;
pub mod health;
pub mod publish;
pub mod status;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    // Documents carry inline images, well past axum's 2 MB default.
    let body_limit = state.config().body_limit_bytes;
    Router::new()
        .merge(health::routes())
        .merge(publish::routes())
        .merge(status::routes())
        .merge(booking::routes())
        .merge(events::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use futures::StreamExt;
    use serde_json::{json, Value};
    use sitepress_core::{EventBus, PublishEvent};
    use sitepress_publish::{GitHubStore, MemoryStore, Publisher};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{AppConfig, TelegramConfig};
    use crate::notify::TelegramNotifier;

    struct Harness {
        router: Router,
        store: MemoryStore,
        bus: EventBus,
    }

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |name: &str| {
            vars.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    fn harness_with(
        config: AppConfig,
        github: Option<GitHubStore>,
        notifier: Option<TelegramNotifier>,
    ) -> Harness {
        let store = MemoryStore::new();
        let publisher = Publisher::new(Arc::new(store.clone()), config.publisher.clone());
        let bus = EventBus::new(16);
        let state = AppState::new(publisher, github, notifier, bus.clone(), config);
        Harness {
            router: build_router(state),
            store,
            bus,
        }
    }

    fn harness() -> Harness {
        harness_with(
            config(&[("PUBLISH_BACKEND", "memory"), ("MAX_ASSET_BYTES", "16")]),
            None,
            None,
        )
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn ping_and_health() {
        let h = harness();
        let response = h.router.clone().oneshot(get("/v1/ping")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = h.router.oneshot(get("/health")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "memory");
        assert_eq!(body["branch"], "main");
    }

    #[tokio::test]
    async fn publish_commits_and_announces() {
        let h = harness();
        let mut events = h.bus.subscribe();

        let response = h
            .router
            .oneshot(post_json(
                "/api/publish",
                &json!({"content": {"site": {"title": "Cakes"}, "blocks": []}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["commitUrl"], Value::Null);
        let tip = h.store.branch_tip("main").unwrap();
        assert_eq!(body["revision"], tip.as_str());

        let published = h.store.read_file(&tip, "content.json").unwrap();
        let published: Value = serde_json::from_slice(&published).unwrap();
        assert_eq!(published["site"]["title"], "Cakes");

        match events.recv().await.unwrap() {
            PublishEvent::Published(event) => {
                assert_eq!(event.revision, tip.as_str());
                assert_eq!(event.asset_count, 0);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_content_is_rejected() {
        let h = harness();
        let response = h
            .router
            .oneshot(post_json("/api/publish", &json!({"content": "nope"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "Missing content");
        assert_eq!(body["error"]["statusCode"], 400);
    }

    #[tokio::test]
    async fn malformed_json_uses_the_error_envelope() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/api/publish")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = h.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["type"], "badRequest");
    }

    #[tokio::test]
    async fn oversized_asset_is_a_validation_error() {
        let h = harness();
        let mut events = h.bus.subscribe();
        // 24 decoded bytes against a 16 byte ceiling.
        let src = format!("data:image/png;base64,{}", "A".repeat(32));

        let response = h
            .router
            .oneshot(post_json(
                "/api/publish",
                &json!({"content": {"blocks": [{"type": "image", "image": {"src": src}}]}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["type"], "validation");
        assert_eq!(h.store.blob_count(), 0);
        assert!(matches!(
            events.recv().await.unwrap(),
            PublishEvent::Failed(event) if event.kind == "validation"
        ));
    }

    #[tokio::test]
    async fn oversized_body_uses_the_error_envelope() {
        let h = harness_with(
            config(&[("PUBLISH_BACKEND", "memory"), ("BODY_LIMIT_BYTES", "64")]),
            None,
            None,
        );
        let title = "x".repeat(256);
        let response = h
            .router
            .oneshot(post_json(
                "/api/publish",
                &json!({"content": {"site": {"title": title}}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert_eq!(body["error"]["type"], "payloadTooLarge");
        assert_eq!(body["error"]["statusCode"], 413);
        assert_eq!(h.store.blob_count(), 0);
    }

    #[tokio::test]
    async fn status_for_memory_backend() {
        let h = harness();
        let body = json_body(h.router.oneshot(get("/api/github-status")).await.unwrap()).await;
        assert_eq!(body, json!({"backend": "memory", "branch": "main"}));
    }

    #[tokio::test]
    async fn status_for_github_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/baker/site"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"default_branch": "main", "private": false})),
            )
            .mount(&server)
            .await;
        let uri = server.uri();
        let config = config(&[
            ("GITHUB_TOKEN", "t"),
            ("GITHUB_OWNER", "baker"),
            ("GITHUB_REPO", "site"),
            ("GITHUB_BRANCH", "gh-pages"),
            ("GITHUB_API_URL", uri.as_str()),
        ]);
        let github = GitHubStore::new(config.github.clone().unwrap()).unwrap();
        let h = harness_with(config, Some(github), None);

        let body = json_body(h.router.oneshot(get("/api/github-status")).await.unwrap()).await;
        assert_eq!(
            body,
            json!({
                "owner": "baker",
                "repo": "site",
                "branch": "gh-pages",
                "defaultBranch": "main",
                "private": false
            })
        );
    }

    #[tokio::test]
    async fn github_status_failure_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
            .mount(&server)
            .await;
        let uri = server.uri();
        let config = config(&[
            ("GITHUB_TOKEN", "t"),
            ("GITHUB_OWNER", "baker"),
            ("GITHUB_REPO", "site"),
            ("GITHUB_API_URL", uri.as_str()),
        ]);
        let github = GitHubStore::new(config.github.clone().unwrap()).unwrap();
        let h = harness_with(config, Some(github), None);

        let response = h.router.oneshot(get("/api/github-status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "unauthorized: Bad credentials");
    }

    #[tokio::test]
    async fn booking_relay_requires_configuration() {
        let h = harness();
        let response = h
            .router
            .oneshot(post_json("/api/booking-request", &json!({"day": "2024-01-01"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn booking_relay_validates_and_sends() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
        let notifier = TelegramNotifier::new(
            reqwest::Client::new(),
            TelegramConfig {
                api_url: server.uri(),
                bot_token: "123:abc".to_string(),
                chat_id: "42".to_string(),
            },
        );
        let h = harness_with(config(&[("PUBLISH_BACKEND", "memory")]), None, Some(notifier));

        let response = h
            .router
            .clone()
            .oneshot(post_json(
                "/api/booking-request",
                &json!({"day": "2024-01-01", "time": "10:00"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["message"], "Missing contact");

        let response = h
            .router
            .oneshot(post_json(
                "/api/booking-request",
                &json!({"day": "2024-01-01", "time": "10:00", "contact": "+7 900 000-00-00"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"ok": true}));
    }

    #[tokio::test]
    async fn event_stream_starts_with_welcome() {
        let h = harness();
        let response = h.router.oneshot(get("/api/events")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        let mut body = response.into_body().into_data_stream();
        let first = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(first.to_vec()).unwrap();
        assert!(text.starts_with("event: welcome\n"), "{text}");
        assert!(text.contains(r#"data: {"type":"welcome"}"#), "{text}");
    }
}
