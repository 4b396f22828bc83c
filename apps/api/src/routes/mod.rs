pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::curriculum::handlers as curriculum;
use crate::history::handlers as history;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation
        .route("/generate", post(curriculum::handle_generate))
        .route("/download-pdf", post(curriculum::handle_download_pdf))
        // History (signed-in users)
        .route("/history", get(history::handle_list_history))
        .route(
            "/history/:id",
            get(history::handle_get_history).delete(history::handle_delete_history),
        )
        .route("/history/:id/pdf", get(history::handle_history_pdf))
        // Accounts
        .route("/signup", post(auth::handle_signup))
        .route("/login", post(auth::handle_login))
        .route("/logout", post(auth::handle_logout))
        .route("/session", get(auth::handle_session))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tokio::task::JoinSet;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::curriculum::generator::tests::{StubGenerator, SEMESTER_TEXT};
    use crate::db::create_pool;

    struct TestApp {
        router: Router,
        llm: Arc<StubGenerator>,
    }

    impl TestApp {
        async fn new(llm: StubGenerator) -> Self {
            let db = create_pool("sqlite::memory:", 1).await.unwrap();
            let llm = Arc::new(llm);
            let state = AppState {
                db,
                llm: llm.clone(),
                config: Config::for_tests(),
            };
            TestApp {
                router: build_router(state),
                llm,
            }
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            cookie: Option<&str>,
            body: Option<Value>,
        ) -> Response {
            self.router
                .clone()
                .oneshot(build_request(method, uri, cookie, body))
                .await
                .unwrap()
        }

        /// Signs up `username` and returns the `session=...` cookie pair.
        async fn sign_up(&self, username: &str) -> String {
            let response = self
                .send(
                    "POST",
                    "/signup",
                    None,
                    Some(json!({"username": username, "password": "hunter2"})),
                )
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            session_cookie(&response).unwrap()
        }
    }

    fn build_request(
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        builder.body(body).unwrap()
    }

    fn session_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("session=") && !v.starts_with("session=;"))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new(StubGenerator::replying(SEMESTER_TEXT)).await;
        let response = app.send("GET", "/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_generate_returns_phase_map_in_order() {
        let app = TestApp::new(StubGenerator::replying(SEMESTER_TEXT)).await;
        let response = app
            .send("POST", "/generate", None, Some(json!({"skill": "X", "duration": "1 year"})))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie(&response).is_some(), "guests get a session cookie");

        let body = json_body(response).await;
        assert_eq!(
            body,
            json!({
                "Semester 1": [
                    {
                        "course_title": "Intro to X",
                        "course_description": "first steps",
                        "topics": ["basics", "setup"]
                    },
                    {"course_title": "Advanced Y", "topics": ["deep dive"]}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_missing_skill_is_rejected_before_llm_call() {
        let app = TestApp::new(StubGenerator::replying(SEMESTER_TEXT)).await;
        let response = app
            .send("POST", "/generate", None, Some(json!({"duration": "1 year"})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["message"], "Please provide a skill");
        assert_eq!(app.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_guest_quota_blocks_after_limit() {
        let app = TestApp::new(StubGenerator::replying(SEMESTER_TEXT)).await;
        let body = json!({"skill": "X"});

        let first = app.send("POST", "/generate", None, Some(body.clone())).await;
        assert_eq!(first.status(), StatusCode::OK);
        let cookie = session_cookie(&first).unwrap();

        // Config::for_tests allows two guest generations.
        let second = app
            .send("POST", "/generate", Some(&cookie), Some(body.clone()))
            .await;
        assert_eq!(second.status(), StatusCode::OK);

        let third = app
            .send("POST", "/generate", Some(&cookie), Some(body.clone()))
            .await;
        assert_eq!(third.status(), StatusCode::FORBIDDEN);
        assert_eq!(app.llm.calls(), 2);

        let session = json_body(app.send("GET", "/session", Some(&cookie), None).await).await;
        assert_eq!(session["authenticated"], false);
        assert_eq!(session["guest_generations_remaining"], 0);
    }

    #[tokio::test]
    async fn test_concurrent_guest_requests_respect_quota() {
        let app = TestApp::new(StubGenerator::replying_after(
            SEMESTER_TEXT,
            Duration::from_millis(200),
        ))
        .await;

        let first = app
            .send("POST", "/generate", None, Some(json!({"skill": "X"})))
            .await;
        assert_eq!(first.status(), StatusCode::OK);
        let cookie = session_cookie(&first).unwrap();

        let mut tasks = JoinSet::new();
        for _ in 0..5 {
            let router = app.router.clone();
            let request = build_request(
                "POST",
                "/generate",
                Some(&cookie),
                Some(json!({"skill": "X"})),
            );
            tasks.spawn(async move { router.oneshot(request).await.unwrap().status() });
        }

        let (mut ok, mut forbidden) = (0, 0);
        while let Some(status) = tasks.join_next().await {
            match status.unwrap() {
                StatusCode::OK => ok += 1,
                StatusCode::FORBIDDEN => forbidden += 1,
                other => panic!("unexpected status {other}"),
            }
        }
        // Config::for_tests allows two guest generations; one is already used.
        assert_eq!((ok, forbidden), (1, 4));
        assert_eq!(app.llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_generation_gives_guest_slot_back() {
        let app = TestApp::new(StubGenerator::failing("model offline")).await;
        let session = app.send("GET", "/session", None, None).await;
        let cookie = session_cookie(&session).unwrap();

        for _ in 0..3 {
            let response = app
                .send("POST", "/generate", Some(&cookie), Some(json!({"skill": "X"})))
                .await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert_eq!(app.llm.calls(), 3);

        let session = json_body(app.send("GET", "/session", Some(&cookie), None).await).await;
        assert_eq!(session["guest_generations_remaining"], 2);
    }

    #[tokio::test]
    async fn test_invalid_ai_output_is_500_and_not_counted() {
        let app = TestApp::new(StubGenerator::replying("Sorry, I can't do that.")).await;
        let response = app
            .send("POST", "/generate", None, Some(json!({"skill": "X"})))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let cookie = session_cookie(&response);
        assert!(cookie.is_none(), "error responses carry no new cookie");
        assert_eq!(json_body(response).await["error"]["message"], "Invalid AI response");
    }

    #[tokio::test]
    async fn test_llm_failure_is_500() {
        let app = TestApp::new(StubGenerator::failing("connection refused")).await;
        let response = app
            .send("POST", "/generate", None, Some(json!({"skill": "X"})))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_history_requires_sign_in() {
        let app = TestApp::new(StubGenerator::replying(SEMESTER_TEXT)).await;
        let response = app.send("GET", "/history", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signed_in_generation_is_saved_with_retention() {
        let app = TestApp::new(StubGenerator::replying(SEMESTER_TEXT)).await;
        let cookie = app.sign_up("ada").await;

        // Signed-in users are not bound by the guest quota; retention is three.
        for skill in ["a", "b", "c", "d"] {
            let response = app
                .send("POST", "/generate", Some(&cookie), Some(json!({"skill": skill})))
                .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let history = json_body(app.send("GET", "/history", Some(&cookie), None).await).await;
        let entries = history.as_array().unwrap();
        let skills: Vec<_> = entries.iter().map(|e| e["skill"].as_str().unwrap()).collect();
        assert_eq!(skills, vec!["d", "c", "b"]);
        assert_eq!(entries[0]["duration"], "1 year");
        assert_eq!(
            entries[0]["curriculum"]["Semester 1"][0]["course_title"],
            "Intro to X"
        );

        let id = entries[0]["id"].as_i64().unwrap();
        let one = app
            .send("GET", &format!("/history/{id}"), Some(&cookie), None)
            .await;
        assert_eq!(one.status(), StatusCode::OK);
        assert_eq!(json_body(one).await["skill"], "d");

        let deleted = app
            .send("DELETE", &format!("/history/{id}"), Some(&cookie), None)
            .await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        let gone = app
            .send("GET", &format!("/history/{id}"), Some(&cookie), None)
            .await;
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_history_is_private_to_owner() {
        let app = TestApp::new(StubGenerator::replying(SEMESTER_TEXT)).await;
        let ada = app.sign_up("ada").await;
        app.send("POST", "/generate", Some(&ada), Some(json!({"skill": "X"})))
            .await;
        let history = json_body(app.send("GET", "/history", Some(&ada), None).await).await;
        let id = history[0]["id"].as_i64().unwrap();

        let grace = app.sign_up("grace").await;
        let response = app
            .send("GET", &format!("/history/{id}/pdf"), Some(&grace), None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .send("GET", &format!("/history/{id}/pdf"), Some(&ada), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    }

    #[tokio::test]
    async fn test_download_pdf_is_an_attachment() {
        let app = TestApp::new(StubGenerator::replying(SEMESTER_TEXT)).await;
        let response = app
            .send(
                "POST",
                "/download-pdf",
                None,
                Some(json!({"skill": "Machine Learning", "duration": "6 months"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Machine_Learning_curriculum.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_signup_login_logout_flow() {
        let app = TestApp::new(StubGenerator::replying(SEMESTER_TEXT)).await;
        app.sign_up("ada").await;

        let duplicate = app
            .send(
                "POST",
                "/signup",
                None,
                Some(json!({"username": "ada", "password": "x"})),
            )
            .await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let wrong = app
            .send(
                "POST",
                "/login",
                None,
                Some(json!({"username": "ada", "password": "nope"})),
            )
            .await;
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let login = app
            .send(
                "POST",
                "/login",
                None,
                Some(json!({"username": "ada", "password": "hunter2"})),
            )
            .await;
        assert_eq!(login.status(), StatusCode::OK);
        let cookie = session_cookie(&login).unwrap();

        let session = json_body(app.send("GET", "/session", Some(&cookie), None).await).await;
        assert_eq!(session["authenticated"], true);
        assert_eq!(session["username"], "ada");
        assert!(session["guest_generations_remaining"].is_null());

        let logout = app.send("POST", "/logout", Some(&cookie), None).await;
        assert_eq!(logout.status(), StatusCode::NO_CONTENT);

        let after = app.send("GET", "/history", Some(&cookie), None).await;
        assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_blank_credentials_are_rejected() {
        let app = TestApp::new(StubGenerator::replying(SEMESTER_TEXT)).await;
        let response = app
            .send(
                "POST",
                "/signup",
                None,
                Some(json!({"username": "  ", "password": "x"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
