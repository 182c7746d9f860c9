//! # keygate
//!
//! API key gate for Axum services. Every request outside the bypass list must
//! carry an `X-api-key` header equal to the canonical key, which is resolved
//! from a two-slot cache with a repository fallback:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → CORS → API key gate)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  KeyValidator                                               │
//! │    cache["api_key"] → cache["redisNew"] → repository        │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  KeyCache (memory | Redis)   │  KeyRepository (memory | PG) │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keygate::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let addr = config.server_addr();
//!     let state = AppState::from_config(config).await?;
//!     let app = build_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```bash
//! API_KEYS=ABC123 cargo run                       # in-memory cache and repository
//! REDIS_URL=redis://127.0.0.1:6379 \
//! DATABASE_URL=postgres://app@localhost/app cargo run
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod shutdown;
pub mod state;
pub mod validator;

// Re-exports for convenience
pub use cache::{KeyCache, MemoryCache, RedisCache};
pub use config::Config;
pub use error::{AppError, AppResult, DataLayerError, Rejection};
pub use repository::{KeyRepository, MemoryKeyRepository, PgKeyRepository};
pub use routes::build_router;
pub use state::AppState;
pub use validator::{CacheSlots, KeyValidator};
