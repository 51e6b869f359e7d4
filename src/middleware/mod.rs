pub mod auth;
pub mod logging;
pub mod response;
pub mod role;

pub use auth::{require_auth, AuthUser};
pub use logging::{handle_panic, log_request_edges};
pub use response::{ApiResponse, ApiResult, IdResponse, TokenResponse};
pub use role::{require_any_role, RoleGate};
