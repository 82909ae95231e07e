use std::sync::Arc;

use axum::Router;

use signal_api::config::Config;
use signal_api::store::{MemoryStore, SessionStore};
use signal_api::AppState;

/// Fixed config for tests — no env vars involved.
pub fn test_config() -> Config {
    Config {
        port: 0,
        stun_urls: vec!["stun:stun.example.org:3478".to_string()],
        turn_url: None,
        turn_username: None,
        turn_credential: None,
    }
}

/// Build a test AppState over an in-memory session store.
pub fn test_state_with_config(config: Config) -> AppState {
    let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
    AppState::new(config, store)
}

#[allow(dead_code)]
pub fn test_state() -> AppState {
    test_state_with_config(test_config())
}

/// Build the full application router wired to the test state.
#[allow(dead_code)]
pub fn test_app() -> (Router, AppState) {
    let state = test_state();
    let app = signal_api::routes::router().with_state(state.clone());
    (app, state)
}
