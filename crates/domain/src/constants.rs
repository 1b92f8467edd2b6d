//! Client constants
//!
//! Storage keys, default endpoints and default tunables shared by every
//! layer.

// Storage keys (kept identical to the web client so stores can be shared)
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

/// All keys written by a session, in the order they are cleared
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

// Endpoints
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SIGNIN_PATH: &str = "/api/v1/auth/signin";
pub const DEFAULT_SIGNUP_PATH: &str = "/api/v1/auth/signup";
pub const DEFAULT_REFRESH_PATH: &str = "/api/v1/auth/refresh";

// Transport
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

// Storage / logging
pub const DEFAULT_SERVICE_NAME: &str = "lessonhub";
pub const DEFAULT_LOG_FILTER: &str = "info";
