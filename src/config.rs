use std::net::SocketAddr;

// === Storage keys ===
pub const USERS_LIST_KEY: &str = "users_list";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn comment_key(id: &str) -> String {
    format!("comment:{}", id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

// === Validation limits ===
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 30;
pub const MIN_PASSWORD_LENGTH: usize = 4;
pub const MAX_FULLNAME_LENGTH: usize = 100;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_CAPTION_LENGTH: usize = 2200;
pub const MAX_COMMENT_LENGTH: usize = 1000;

// === Feed / media ===
pub const SUGGESTION_SAMPLE_SIZE: usize = 4;
pub const AVATAR_SIZE: u32 = 250;

pub fn token_expiration_hours() -> i64 {
    std::env::var("SHUTTER_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn kv_label() -> String {
    std::env::var("SHUTTER_KV_LABEL").unwrap_or_else(|_| "default".to_string())
}

/// Settings for the native server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Env: `SHUTTER_HTTP_ADDR`, default `0.0.0.0:3000`.
    pub http_addr: SocketAddr,
    /// Env: `SHUTTER_SEED_DEMO_DATA`, default `false`.
    pub seed_demo_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 3000).into(),
            seed_demo_data: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SHUTTER_HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid SHUTTER_HTTP_ADDR, using default"),
            }
        }

        if let Ok(flag) = std::env::var("SHUTTER_SEED_DEMO_DATA") {
            config.seed_demo_data = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        config
    }
}
