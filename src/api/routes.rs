//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, create_store_handler, delete_item_handler, drop_store_handler,
    get_item_handler, health_handler, keys_handler, list_stores_handler, merge_item_handler,
    multi_get_handler, prune_handler, records_handler, set_item_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stores` - List stores
/// - `POST /stores` - Create a store
/// - `DELETE /stores/:store` - Drop a store and its data
/// - `GET /stores/:store/keys` - List stored keys
/// - `GET /stores/:store/records` - List live records
/// - `GET /stores/:store/stats` - Store statistics
/// - `POST /stores/:store/prune` - Prune outdated and stale records
/// - `DELETE /stores/:store/items` - Clear a store
/// - `GET|PUT|PATCH|DELETE /stores/:store/items/:key` - Read, write, merge or remove an item
/// - `POST /stores/:store/multi-get` - Read several items
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stores", get(list_stores_handler).post(create_store_handler))
        .route("/stores/:store", delete(drop_store_handler))
        .route("/stores/:store/keys", get(keys_handler))
        .route("/stores/:store/records", get(records_handler))
        .route("/stores/:store/stats", get(stats_handler))
        .route("/stores/:store/prune", post(prune_handler))
        .route("/stores/:store/items", delete(clear_handler))
        .route(
            "/stores/:store/items/:key",
            get(get_item_handler)
                .put(set_item_handler)
                .patch(merge_item_handler)
                .delete(delete_item_handler),
        )
        .route("/stores/:store/multi-get", post(multi_get_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
