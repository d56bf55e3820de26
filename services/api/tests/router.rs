use std::sync::{Arc, Mutex as StdMutex};

use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use lesson_core::controller::{Controller, RATE_LIMIT_MESSAGE};
use lesson_core::domain::{
    ContentBundle, GeneratedSections, LogicPuzzle, MiniGame, QaEntry, Question, QuestionKind,
    SearchParams, Slide,
};
use lesson_core::memory_store::MemoryStore;
use lesson_core::ports::{ContentGenerationService, ImageGenerationService, PortError, PortResult};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

//=========================================================================================
// Fakes
//=========================================================================================

#[derive(Default)]
struct ScriptedGenerator {
    failures: StdMutex<Vec<PortError>>,
}

#[async_trait]
impl ContentGenerationService for ScriptedGenerator {
    async fn generate_content(&self, params: &SearchParams) -> PortResult<ContentBundle> {
        if let Some(e) = self.failures.lock().unwrap().pop() {
            return Err(e);
        }
        Ok(ContentBundle::assemble(
            params,
            GeneratedSections {
                presentation: vec![
                    Slide {
                        title: "Kirish".to_string(),
                        content: "ax² + bx + c = 0".to_string(),
                        image_prompt: Some("parabola".to_string()),
                        image_url: None,
                    },
                    Slide {
                        title: "Diskriminant".to_string(),
                        content: "D = b² - 4ac".to_string(),
                        image_prompt: Some("formula".to_string()),
                        image_url: None,
                    },
                ],
                tests: vec![
                    Question {
                        kind: QuestionKind::MultipleChoice,
                        question: "D < 0 bo'lsa?".to_string(),
                        options: Some(vec!["Ikki ildiz".to_string(), "Ildiz yo'q".to_string()]),
                        answer: "Ildiz yo'q".to_string(),
                    },
                    Question {
                        kind: QuestionKind::ShortAnswer,
                        question: "Diskriminant formulasi?".to_string(),
                        options: None,
                        answer: "b² - 4ac".to_string(),
                    },
                ],
                qa: vec![QaEntry {
                    question: "Diskriminant nima?".to_string(),
                    answer: "b² - 4ac".to_string(),
                }],
                crossword: vec![],
                logic_puzzle: LogicPuzzle { puzzle: "p".to_string(), answer: "a".to_string() },
                mini_game: MiniGame { title: "t".to_string(), description: "d".to_string(), rules: vec![] },
            },
        ))
    }
}

/// Draws the first slide, then runs out of quota.
#[derive(Default)]
struct OneImageThenQuota {
    calls: StdMutex<usize>,
}

#[async_trait]
impl ImageGenerationService for OneImageThenQuota {
    async fn generate_slide_image(&self, _prompt: &str) -> PortResult<String> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls == 1 {
            Ok("data:image/png;base64,QUJD".to_string())
        } else {
            Err(PortError::QuotaExceeded)
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn state_with(generator: ScriptedGenerator, splash_delay_ms: &str) -> Arc<AppState> {
    let splash_delay_ms = splash_delay_ms.to_string();
    let config = Config::from_lookup(move |key| match key {
        "GEMINI_API_KEY" => Some("test".to_string()),
        "SPLASH_DELAY_MS" => Some(splash_delay_ms.clone()),
        _ => None,
    })
    .unwrap();
    Arc::new(AppState {
        controller: Arc::new(Mutex::new(Controller::new(Arc::new(MemoryStore::new())))),
        config: Arc::new(config),
        content_adapter: Arc::new(generator),
        image_adapter: Arc::new(OneImageThenQuota::default()),
    })
}

async fn app_with(generator: ScriptedGenerator) -> Router {
    let state = state_with(generator, "0");
    state.spawn_initialization().await.unwrap();
    build_router(state)
}

async fn app() -> Router {
    app_with(ScriptedGenerator::default()).await
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn register_ali(app: &Router) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        Some(json!({ "fullName": "Ali Valiyev", "email": "ali@test.uz", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn generate(app: &Router) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/content/generate",
        Some(json!({ "subject": "Matematika", "topic": "Kvadrat tenglamalar", "grade": "8-sinf" })),
    )
    .await
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "unauthenticated");

    let (status, _) = generate(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "GET", "/history", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn routes_are_unavailable_during_the_configured_splash() {
    let state = state_with(ScriptedGenerator::default(), "60000");
    let init = state.spawn_initialization();
    let app = build_router(state);

    let (status, body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "initializing");

    let (status, _) = send(&app, "GET", "/history", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    init.abort();
}

#[tokio::test]
async fn registration_validates_and_signs_in() {
    let app = app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        Some(json!({ "fullName": "Ali Valiyev", "email": "ali@test.uz", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let user = register_ali(&app).await;
    assert_eq!(user["fullName"], "Ali Valiyev");
    assert!(user.get("passwordHash").is_none());

    let (_, status_body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status_body["phase"], "authenticated");
    assert_eq!(status_body["user"]["email"], "ali@test.uz");

    send(&app, "POST", "/auth/logout", None).await;
    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        Some(json!({ "fullName": "Boshqa", "email": "ali@test.uz", "password": "secret2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_rejects_wrong_credentials() {
    let app = app().await;
    register_ali(&app).await;
    send(&app, "POST", "/auth/logout", None).await;

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        Some(json!({ "email": "ali@test.uz", "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        Some(json!({ "email": "nobody@test.uz", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        Some(json!({ "email": "ali@test.uz", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ali@test.uz");
}

#[tokio::test]
async fn generation_requires_subject_and_topic() {
    let app = app().await;
    register_ali(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        "/content/generate",
        Some(json!({ "subject": "Matematika", "topic": "  ", "grade": "8-sinf" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quota_errors_surface_the_rate_limit_message() {
    let app = app_with(ScriptedGenerator {
        failures: StdMutex::new(vec![PortError::QuotaExceeded]),
    })
    .await;
    register_ali(&app).await;

    let (status, body) = generate(&app).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, Value::String(RATE_LIMIT_MESSAGE.to_string()));

    let (_, status_body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status_body["loading"], false);
    assert_eq!(status_body["error"], RATE_LIMIT_MESSAGE);

    send(&app, "POST", "/error/dismiss", None).await;
    let (_, status_body) = send(&app, "GET", "/status", None).await;
    assert!(status_body["error"].is_null());
}

#[tokio::test]
async fn quiz_and_qa_interaction() {
    let app = app().await;
    register_ali(&app).await;
    let (status, _) = generate(&app).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "PUT", "/quiz/answers/0", Some(json!({ "answer": "Ildiz yo'q" }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "PUT", "/quiz/answers/1", Some(json!({ "answer": "  B² - 4AC " }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "PUT", "/quiz/answers/9", Some(json!({ "answer": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, score) = send(&app, "POST", "/quiz/score", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(score, json!({ "correct": 2, "total": 2 }));

    let (status, _) = send(&app, "PUT", "/quiz/answers/0", Some(json!({ "answer": "Ikki ildiz" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "POST", "/quiz/reset", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, view) = send(&app, "GET", "/presentation", None).await;
    assert_eq!(view["quiz"]["locked"], false);
    assert!(view["qa"][0].get("answer").is_none());

    let (_, toggled) = send(&app, "POST", "/qa/0/toggle", None).await;
    assert_eq!(toggled, json!({ "index": 0, "open": true }));
    let (_, view) = send(&app, "GET", "/presentation", None).await;
    assert_eq!(view["qa"][0]["answer"], "b² - 4ac");

    let (status, _) = send(&app, "POST", "/qa/5/toggle", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn image_backfill_falls_back_after_quota() {
    let app = app().await;
    register_ali(&app).await;
    generate(&app).await;

    let (status, report) = send(&app, "POST", "/content/current/images", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["generated"], 1);
    assert_eq!(report["fallback"], 1);
    assert_eq!(report["quotaExceeded"], true);

    let (_, current) = send(&app, "GET", "/content/current", None).await;
    assert_eq!(current["presentation"][0]["imageUrl"], "data:image/png;base64,QUJD");
    assert_eq!(
        current["presentation"][1]["imageUrl"],
        "https://picsum.photos/seed/Diskriminant1/800/450"
    );

    // Every slide has an image now, so nothing more is requested.
    let (_, report) = send(&app, "POST", "/content/current/images", None).await;
    assert_eq!(report["requested"], 0);
}

#[tokio::test]
async fn full_teacher_session() {
    let app = app().await;
    register_ali(&app).await;

    let (status, bundle) = generate(&app).await;
    assert_eq!(status, StatusCode::OK);
    let first_id = bundle["id"].as_str().unwrap().to_string();
    assert_eq!(bundle["subject"], "Matematika");

    let (status, _) = send(
        &app,
        "POST",
        "/content/generate",
        Some(json!({ "subject": "Fizika", "topic": "Nyuton qonunlari", "grade": "7-sinf", "language": "Russian" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, history) = send(&app, "GET", "/history", None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["subject"], "Fizika");
    assert_eq!(history[1]["id"], first_id.as_str());

    let (status, _) = send(&app, "PUT", "/view/history", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, selected) = send(&app, "POST", &format!("/history/{}/select", first_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(selected["topic"], "Kvadrat tenglamalar");
    let (_, status_body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status_body["view"], "create");
    assert_eq!(status_body["currentBundleId"], first_id.as_str());

    let (status, _) = send(&app, "POST", "/history/missing/select", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // History survives a logout and login.
    send(&app, "POST", "/auth/logout", None).await;
    send(
        &app,
        "POST",
        "/auth/login",
        Some(json!({ "email": "ali@test.uz", "password": "secret1" })),
    )
    .await;
    let (_, history) = send(&app, "GET", "/history", None).await;
    assert_eq!(history.as_array().unwrap().len(), 2);

    let (_, cleared) = send(&app, "DELETE", "/history", None).await;
    assert_eq!(cleared["cleared"], false);
    let (_, cleared) = send(&app, "DELETE", "/history?confirm=true", None).await;
    assert_eq!(cleared["cleared"], true);
    let (_, history) = send(&app, "GET", "/history", None).await;
    assert!(history.as_array().unwrap().is_empty());
}
