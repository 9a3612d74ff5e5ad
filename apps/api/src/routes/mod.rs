pub mod ai;
pub mod client_identity;
pub mod health;
pub mod json_body;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/ai/generate", post(ai::handle_generate))
        .route("/api/ai/normalize", post(ai::handle_normalize))
        .route("/api/ai/status", get(ai::handle_ai_status))
        .route("/api/ai/cache", delete(ai::handle_clear_cache))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::generation::orchestrator::GenerationOrchestrator;
    use crate::llm_client::mock::MockModelClient;

    const ROADMAP: &str = r#"Here you go:
```json
{"Title":"Frontend Engineer","Explanation":"Builds the user-facing web.","Average Salary":"$70k","Job Openings":"High","YouTube Video Recommendation":"https://www.youtube.com/watch?v=frontend","Learning Resources":[{"title":"MDN","url":"https://developer.mozilla.org","type":"article"}]}
```"#;

    fn app(model: Arc<MockModelClient>, overrides: &[(&str, &str)]) -> Router {
        let vars: HashMap<String, String> = overrides
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let orchestrator = Arc::new(GenerationOrchestrator::from_config(&config, model));
        build_router(AppState {
            orchestrator,
            config,
        })
    }

    fn post_json(uri: &str, body: Value, client: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", client)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_then_cached() {
        let model = Arc::new(MockModelClient::returning(ROADMAP));
        let app = app(model.clone(), &[]);

        let response = app
            .clone()
            .oneshot(post_json("/api/ai/generate", json!({"prompt": "Frontend Engineer"}), "203.0.113.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let first = body_json(response).await;
        assert_eq!(first["title"], "Frontend Engineer");
        assert_eq!(first["average_salary"], "$70k");
        assert_eq!(first["youtube_video_recommendation"], "https://www.youtube.com/watch?v=frontend");
        assert_eq!(first["learning_resources"][0]["type"], "article");
        assert_eq!(first["cached"], false);
        assert_eq!(first["degraded"], false);
        assert!(first["generation_time_ms"].is_u64());

        let response = app
            .oneshot(post_json("/api/ai/generate", json!({"prompt": "Frontend Engineer"}), "203.0.113.1"))
            .await
            .unwrap();
        let second = body_json(response).await;
        assert_eq!(second["cached"], true);
        assert_eq!(second["title"], first["title"]);
        assert_eq!(second["learning_resources"], first["learning_resources"]);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_eleventh_request_returns_429() {
        let model = Arc::new(MockModelClient::returning(ROADMAP));
        let app = app(model, &[]);

        for _ in 0..10 {
            let response = app
                .clone()
                .oneshot(post_json("/api/ai/generate", json!({"prompt": "Frontend Engineer"}), "198.51.100.4"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(post_json("/api/ai/generate", json!({"prompt": "Frontend Engineer"}), "198.51.100.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        let body = body_json(response).await;
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("10"));
        assert!(message.contains("60"));
    }

    #[tokio::test]
    async fn test_empty_prompt_is_400() {
        let app = app(Arc::new(MockModelClient::returning(ROADMAP)), &[]);
        let response = app
            .oneshot(post_json("/api/ai/generate", json!({"prompt": "  "}), "192.0.2.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_PROMPT");
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let app = app(Arc::new(MockModelClient::returning(ROADMAP)), &[]);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/ai/generate")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"prompt\": "))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");

        let response = app
            .clone()
            .oneshot(post_json("/api/ai/generate", json!({"query": "Frontend"}), "192.0.2.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("prompt"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/ai/normalize")
                    .body(Body::from("{\"raw\": \"x\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unavailable_model_is_503_without_fallback() {
        let app = app(Arc::new(MockModelClient::unavailable()), &[]);
        let response = app
            .oneshot(post_json("/api/ai/generate", json!({"prompt": "Frontend Engineer"}), "192.0.2.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unavailable_model_is_degraded_200_with_fallback() {
        let app = app(
            Arc::new(MockModelClient::unavailable()),
            &[("FALLBACK_ENABLED", "true")],
        );
        let response = app
            .oneshot(post_json(
                "/api/ai/generate",
                json!({"prompt": "I want a job as a data scientist"}),
                "192.0.2.1",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["degraded"], true);
        assert!(body["title"].as_str().unwrap().contains("data scientist"));
    }

    #[tokio::test]
    async fn test_unparseable_model_output_hides_detail_in_production() {
        let app = app(
            Arc::new(MockModelClient::returning("totally not json, user secret inside")),
            &[("ENVIRONMENT", "production")],
        );
        let response = app
            .oneshot(post_json("/api/ai/generate", json!({"prompt": "Frontend Engineer"}), "192.0.2.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNPARSEABLE_RESPONSE");
        assert!(!body["error"]["message"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn test_normalize_caller_text() {
        let app = app(Arc::new(MockModelClient::returning(ROADMAP)), &[]);
        let response = app
            .clone()
            .oneshot(post_json("/api/ai/normalize", json!({"raw": ROADMAP}), "192.0.2.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["job_openings"], "High");

        let response = app
            .oneshot(post_json(
                "/api/ai/normalize",
                json!({"raw": "{\"title\": \"Only a title\"}"}),
                "192.0.2.1",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]["message"].as_str().unwrap().contains("explanation"));
    }

    #[tokio::test]
    async fn test_health_reports_model_and_fallback() {
        let app = app(
            Arc::new(MockModelClient::returning(ROADMAP)),
            &[("FALLBACK_ENABLED", "true")],
        );
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["model_identifier"], "mock-model");
        assert_eq!(body["fallback_enabled"], true);
    }

    #[tokio::test]
    async fn test_clear_cache_reports_removed_entries() {
        let app = app(Arc::new(MockModelClient::returning(ROADMAP)), &[]);
        app.clone()
            .oneshot(post_json("/api/ai/generate", json!({"prompt": "Frontend Engineer"}), "192.0.2.1"))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/ai/cache")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["entries_removed"], 1);
    }

    #[tokio::test]
    async fn test_ai_status_reports_ready_client() {
        let app = app(Arc::new(MockModelClient::returning(ROADMAP)), &[]);
        let response = app
            .oneshot(Request::builder().uri("/api/ai/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["provider"], "mock");
    }
}
