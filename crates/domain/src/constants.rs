//! Application constants
//!
//! Provider endpoints and defaults shared by configuration and clients.

// Identity provider
pub const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const DEFAULT_SCOPES: &[&str] = &["user-read-private", "user-read-email", "user-top-read"];

// Resource API
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOP_ITEMS_LIMIT: u32 = 20;
pub const MAX_TOP_ITEMS_LIMIT: u32 = 50;

// Timeouts and retries
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

// Local storage
pub const DEFAULT_STORAGE_NAMESPACE: &str = "tunestats";
pub const TOKEN_FILE_NAME: &str = "session.json";
