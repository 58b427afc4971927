//! Bearer-token authorization
//!
//! Two shared secrets from configuration: one for the cron caller, one for
//! the management API.

mod middleware;

pub use middleware::{require_api_token, require_cron_secret};
