/// Signal API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// STUN server URLs handed to clients for ICE gathering.
    pub stun_urls: Vec<String>,
    /// Optional TURN relay URL.
    pub turn_url: Option<String>,
    /// TURN credentials, required only when `turn_url` is set.
    pub turn_username: Option<String>,
    pub turn_credential: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4010),
            stun_urls: std::env::var("STUN_URLS")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|s| s.split(',').map(|u| u.trim().to_string()).collect())
                .unwrap_or_else(|| vec!["stun:stun.l.google.com:19302".to_string()]),
            turn_url: optional_var("TURN_URL"),
            turn_username: optional_var("TURN_USERNAME"),
            turn_credential: optional_var("TURN_CREDENTIAL"),
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
