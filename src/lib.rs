pub mod client_identity;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod fixed_window;
pub mod guard;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod rate_limiter;
pub mod redis;
pub mod response;
pub mod route_policy;
pub mod sanitize;
pub mod security_headers;
pub mod server;
pub mod store;

pub use config::{Config, Environment};
pub use error::{GuardError, Result};
pub use guard::{GateOutcome, Guard};
pub use rate_limiter::RateLimiter;
pub use server::create_app;
