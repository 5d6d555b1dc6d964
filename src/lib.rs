// Library root for the Telegram user registry

pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod store;

use axum::{routing::get, Router};

use handlers::{
    health_check,
    users::{get_all_users, get_user_by_id},
};
use middleware::create_middleware_stack;

// Re-export commonly used types
pub use db::Database;
pub use error::ApiError;
pub use models::{SenderProfile, UserPayload, UserRecord};
pub use store::{SharedStore, Table, UserStore};

/// Create the Axum router with all endpoints and middleware
pub fn create_router(store: SharedStore) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Read-only user endpoints
        .route("/api/users", get(get_all_users))
        .route("/api/users/:id", get(get_user_by_id))
        .with_state(store)
        .layer(create_middleware_stack())
}
