pub mod chat_task;
pub mod generation_task;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod routes;
pub mod state;
pub mod store_handlers;
pub mod ws_handler;

// Re-export the router builder and the WebSocket handler to make them easily
// accessible to the binary that runs the web server.
pub use middleware::require_credential;
pub use routes::build_router;
pub use ws_handler::ws_handler;
