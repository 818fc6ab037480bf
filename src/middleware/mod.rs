mod auth;
mod auto_logout;
mod cooldown;
mod error_handler;
mod identity;
mod rate_limit;

pub use auth::{AuthUser, auth_middleware};
pub use auto_logout::auto_logout;
pub(crate) use auto_logout::remaining_seconds;
pub use cooldown::{CooldownGate, cooldown};
pub use error_handler::log_errors;
pub use identity::{OTP_SEND_PATH, ResolvedIdentity, client_ip, resolve_identity};
pub use rate_limit::{RateLimiter, rate_limit};
