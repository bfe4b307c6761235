//! API Module
//!
//! HTTP handlers and routing for the record cache REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET|POST /stores` - List or create stores
//! - `DELETE /stores/:store` - Drop a store
//! - `GET /stores/:store/{keys,records,stats}` - Inspect a store
//! - `POST /stores/:store/prune` - Prune a store on demand
//! - `/stores/:store/items[/:key]` - Item access
//! - `POST /stores/:store/multi-get` - Batched reads

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
