mod api;
mod api_key;

pub use api::{ApiResponse, HealthResponse, ReadinessResponse, WhoAmIResponse};
pub use api_key::{ApiKeyRecord, KeySource};
