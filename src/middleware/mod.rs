//! HTTP middleware.
//!
//! ```text
//! Request → Request ID → Trace → CORS → API key → Body limit → Handler
//!                                          ↓
//!                                  403 {"success": false, ...}
//! ```
//!
//! Request IDs come from `tower-http` (`x-request-id`, generated as a UUID
//! when absent and echoed on the response); only the API key check is
//! implemented here.

pub mod auth;

pub use auth::{API_KEY_HEADER, ApiKeyAuth, ApiKeyAuthService};
