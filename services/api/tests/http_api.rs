//! End-to-end tests of the HTTP surface, driven through the router with `oneshot`.

mod common;

use api_lib::web::build_router;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{
    body_json, card, empty_request, json_request, question, test_app, ScriptedGateway, TEST_KEY,
};
use serde_json::json;
use study_assistant_core::{catalog::Provider, domain::DocumentSummary};
use tower::ServiceExt;

fn router(gateway: ScriptedGateway, with_key: bool) -> (Router, common::TestApp) {
    let app = test_app(gateway, with_key);
    let router = build_router(app.state.clone()).unwrap();
    (router, app)
}

#[tokio::test]
async fn settings_start_with_defaults() {
    let (router, _app) = router(ScriptedGateway::default(), false);

    let response = router.oneshot(empty_request("GET", "/settings")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["theme"], "system");
    assert_eq!(body["configuredProviders"], json!([]));
}

#[tokio::test]
async fn providers_lists_the_whole_catalog() {
    let (router, _app) = router(ScriptedGateway::default(), false);

    let body = body_json(router.oneshot(empty_request("GET", "/providers")).await.unwrap()).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["openai", "anthropic", "google", "deepseek"]);
}

#[tokio::test]
async fn ai_routes_require_a_key_for_the_active_provider() {
    let (router, app) = router(ScriptedGateway::default(), false);

    let response = router
        .oneshot(json_request("POST", "/quizzes/generate", json!({ "topic": "History" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("openai"));
    assert_eq!(app.factory.connect_count(), 0);
}

#[tokio::test]
async fn setting_a_key_unlocks_generation() {
    let gateway = ScriptedGateway {
        questions: vec![question("When did Rome fall?", 3)],
        ..ScriptedGateway::default()
    };
    let (router, app) = router(gateway, false);

    let response = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/settings/api-keys/openai",
            json!({ "apiKey": TEST_KEY }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["configured"], true);
    assert_eq!(status["matchesPrefix"], true);

    let response = router
        .oneshot(json_request("POST", "/quizzes/generate", json!({ "topic": "History" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let quiz = body_json(response).await;
    assert_eq!(quiz["topic"], "History");
    assert_eq!(quiz["questions"].as_array().unwrap().len(), 1);

    let config = app.factory.last_config.lock().unwrap().clone().unwrap();
    assert_eq!(config.provider, Provider::OpenAi);
    assert_eq!(config.model, "gpt-4o");
    assert_eq!(config.api_key, TEST_KEY);
}

#[tokio::test]
async fn api_keys_are_not_written_to_storage() {
    let (router, app) = router(ScriptedGateway::default(), false);

    router
        .clone()
        .oneshot(json_request("PUT", "/settings/theme", json!({ "theme": "dark" })))
        .await
        .unwrap();
    router
        .oneshot(json_request(
            "PUT",
            "/settings/api-keys/deepseek",
            json!({ "apiKey": "sk-secret-deepseek" }),
        ))
        .await
        .unwrap();

    let payload = app.storage.payload("synapse-settings").unwrap();
    assert!(payload.contains("dark"));
    assert!(!payload.contains("sk-secret-deepseek"));
}

#[tokio::test]
async fn unknown_provider_is_a_bad_request() {
    let (router, _app) = router(ScriptedGateway::default(), false);

    let response = router
        .oneshot(json_request("PUT", "/settings/provider", json!({ "provider": "mistral" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn switching_provider_selects_its_default_model() {
    let (router, _app) = router(ScriptedGateway::default(), false);

    let response = router
        .oneshot(json_request("PUT", "/settings/provider", json!({ "provider": "anthropic" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["provider"], "anthropic");
    assert_eq!(body["model"], "claude-sonnet-4-20250514");
}

#[tokio::test]
async fn deck_and_flashcard_lifecycle() {
    let (router, _app) = router(ScriptedGateway::default(), false);

    let response = router
        .clone()
        .oneshot(json_request("POST", "/decks", json!({ "name": "Spanish" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let deck = body_json(response).await;
    let deck_id = deck["id"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/decks/{}/flashcards", deck_id),
            json!({ "cards": [card("hola", "hello"), card("adios", "goodbye")] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let added = body_json(response).await;
    let card_id = added[0]["id"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/flashcards/{}", card_id),
            json!({ "back": "hi" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let edited = body_json(response).await;
    assert_eq!(edited["front"], "hola");
    assert_eq!(edited["back"], "hi");

    let response = router
        .clone()
        .oneshot(empty_request("DELETE", &format!("/flashcards/{}", card_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router.clone().oneshot(empty_request("GET", "/decks")).await.unwrap();
    let decks = body_json(response).await;
    assert_eq!(decks[0]["cardCount"], 1);

    let response = router
        .clone()
        .oneshot(empty_request("DELETE", &format!("/decks/{}", deck_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(empty_request("GET", &format!("/decks/{}/flashcards", deck_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let (router, _app) = router(ScriptedGateway::default(), false);

    let response = router
        .oneshot(empty_request(
            "GET",
            "/conversations/7f1b0c36-2f7e-4c8e-9a51-8f2d0e6b9c11",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn answering_and_completing_a_quiz_computes_the_score() {
    let gateway = ScriptedGateway {
        questions: vec![question("First", 0), question("Second", 1)],
        ..ScriptedGateway::default()
    };
    let (router, _app) = router(gateway, true);

    let quiz = body_json(
        router
            .clone()
            .oneshot(json_request(
                "POST",
                "/quizzes/generate",
                json!({ "topic": "Basics", "count": 2 }),
            ))
            .await
            .unwrap(),
    )
    .await;
    let quiz_id = quiz["id"].as_str().unwrap().to_string();
    let first = quiz["questions"][0]["id"].as_str().unwrap().to_string();
    let second = quiz["questions"][1]["id"].as_str().unwrap().to_string();

    for (question_id, answer) in [(&first, 0), (&second, 0)] {
        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/quizzes/{}/questions/{}/answer", quiz_id, question_id),
                json!({ "answerIndex": answer }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = router
        .oneshot(empty_request("POST", &format!("/quizzes/{}/complete", quiz_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let completed = body_json(response).await;
    assert_eq!(completed["score"], 50);
    assert!(completed["completedAt"].is_i64());
}

#[tokio::test]
async fn uploaded_document_is_summarized() {
    let summary = DocumentSummary {
        summary: "Photosynthesis turns light into sugar.".to_string(),
        key_points: vec!["Light reactions".to_string()],
        topics: vec!["Biology".to_string()],
        study_questions: vec!["Where does it happen?".to_string()],
    };
    let gateway = ScriptedGateway {
        summary: Some(summary),
        ..ScriptedGateway::default()
    };
    let (router, app) = router(gateway, true);

    let boundary = "study-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nPlants use sunlight.\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/documents/summarize")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["summary"], "Photosynthesis turns light into sugar.");
    assert_eq!(body["keyPoints"][0], "Light reactions");

    let sent = app.factory.gateway.last_document.lock().unwrap().clone();
    assert_eq!(sent.as_deref(), Some("Plants use sunlight."));
}

#[tokio::test]
async fn study_plan_requests_are_validated() {
    let (router, app) = router(ScriptedGateway::default(), true);

    let response = router
        .oneshot(json_request(
            "POST",
            "/plans/generate",
            json!({ "subjects": ["Math"], "durationDays": 7, "hoursPerDay": 30.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.factory.connect_count(), 0);
}
