mod health;
mod root;

pub use health::{health_check, readiness_check};
pub use root::{index, not_found, whoami};
