//! Keep-alive endpoint polled by the external uptime monitor.

use axum::{routing::get, Router};

/// Body returned by `GET /`.
pub const BODY: &str = "Home route";

/// Build the liveness router. `/` is the only route.
pub fn router() -> Router {
    Router::new().route("/", get(home))
}

/// `GET /`: always `200 OK` with a fixed plain-text body.
///
/// No state, no dependencies on the bot worker; it keeps answering after the
/// worker has stopped.
pub async fn home() -> &'static str {
    BODY
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt; // oneshot

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn root_returns_200_with_fixed_body() {
        let resp = super::router().oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"), "content-type: {content_type}");

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Home route");
    }

    #[tokio::test]
    async fn root_answers_repeated_requests_identically() {
        let app = super::router();
        for _ in 0..20 {
            let resp = app.clone().oneshot(get("/")).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], super::BODY.as_bytes());
        }
    }

    #[tokio::test]
    async fn root_ignores_query_string() {
        let resp = super::router().oneshot(get("/?ping=1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let resp = super::router().oneshot(get("/healthz")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_get_methods_are_rejected() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let resp = super::router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn keeps_answering_after_bot_worker_has_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = crate::config::BotConfig {
            log_file: dir.path().join("log.txt").display().to_string(),
            gateway_url: "ws://127.0.0.1:1".into(),
            ..crate::config::BotConfig::default()
        };
        let worker = crate::worker::spawn(cfg, "secret".into()).unwrap();
        worker.stop();
        tokio::task::spawn_blocking(move || worker.join())
            .await
            .unwrap()
            .unwrap();

        let resp = super::router().oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
