//! services/api/src/web/routes.rs
//!
//! Assembles the complete HTTP surface: store routes, credential-guarded AI
//! routes, CORS and the Swagger UI.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::{
    middleware::require_credential,
    rest::{self, ApiDoc},
    state::AppState,
    store_handlers as store,
    ws_handler,
};

/// Uploaded documents are truncated after reading, but the request itself is capped here.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Builds the application router for `app_state`.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| {
            ConfigError::InvalidValue("ALLOWED_ORIGIN".to_string(), e.to_string())
        })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Store routes (no provider involved)
    let store_routes = Router::new()
        .route("/settings", get(store::get_settings_handler))
        .route("/settings/provider", put(store::set_provider_handler))
        .route("/settings/model", put(store::set_model_handler))
        .route("/settings/theme", put(store::set_theme_handler))
        .route("/settings/api-keys/{provider}", put(store::set_api_key_handler))
        .route("/providers", get(store::list_providers_handler))
        .route(
            "/conversations",
            get(store::list_conversations_handler)
                .post(store::create_conversation_handler)
                .delete(store::clear_conversations_handler),
        )
        .route(
            "/conversations/active",
            get(store::get_active_conversation_handler).put(store::set_active_conversation_handler),
        )
        .route(
            "/conversations/{id}",
            get(store::get_conversation_handler).delete(store::delete_conversation_handler),
        )
        .route(
            "/decks",
            get(store::list_decks_handler).post(store::create_deck_handler),
        )
        .route("/decks/{id}", delete(store::delete_deck_handler))
        .route(
            "/decks/{id}/flashcards",
            get(store::list_deck_flashcards_handler).post(store::add_flashcards_handler),
        )
        .route(
            "/flashcards/{id}",
            patch(store::update_flashcard_handler)
                .delete(store::delete_flashcard_handler),
        )
        .route("/quizzes", get(store::list_quizzes_handler))
        .route(
            "/quizzes/{id}",
            get(store::get_quiz_handler).delete(store::delete_quiz_handler),
        )
        .route(
            "/quizzes/{id}/questions/{question_id}/answer",
            put(store::answer_question_handler),
        )
        .route("/quizzes/{id}/complete", post(store::complete_quiz_handler))
        .route("/plans", get(store::list_plans_handler))
        .route(
            "/plans/active",
            get(store::get_active_plan_handler).put(store::set_active_plan_handler),
        )
        .route("/plans/active/progress", get(store::get_progress_handler))
        .route("/plans/active/today", get(store::get_today_sessions_handler))
        .route("/plans/{id}", delete(store::delete_plan_handler))
        .route("/sessions/{id}/complete", post(store::complete_session_handler))
        .route("/sessions/{id}/schedule", put(store::reschedule_session_handler));

    // AI-backed routes (an API key for the active provider is required)
    let ai_routes = Router::new()
        .route("/quizzes/generate", post(rest::generate_quiz_handler))
        .route("/flashcards/generate", post(rest::generate_flashcards_handler))
        .route("/plans/generate", post(rest::generate_plan_handler))
        .route("/documents/summarize", post(rest::summarize_document_handler))
        .route("/explain", post(rest::explain_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_credential,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(store_routes)
        .merge(ai_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
