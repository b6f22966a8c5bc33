//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core_state::AppState;
use crate::models::User;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<AppState>,
    pub sessions: Arc<Mutex<SessionStore>>,
}

impl ApiContext {
    pub fn new(core: Arc<AppState>) -> Self {
        Self { core, sessions: Arc::new(Mutex::new(SessionStore::new())) }
    }
}

/// Authenticated user, injected into request extensions by the auth
/// middleware after token validation.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// In-memory session store. Tokens are kept hashed; holding the map never
/// exposes a usable credential.
pub struct SessionStore {
    sessions: HashMap<[u8; 32], String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self { sessions: HashMap::new() }
    }

    /// Issue a fresh bearer token for a user. Returns the plaintext token;
    /// only its hash is retained.
    pub fn issue(&mut self, user_id: &str) -> String {
        let token = generate_token();
        self.sessions.insert(hash_token(&token), user_id.to_string());
        token
    }

    /// Resolve a bearer token to a user id.
    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.sessions.get(&hash_token(token)).map(String::as_str)
    }

    /// Revoke one session. Returns whether it existed.
    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    /// Revoke every session belonging to a user.
    pub fn revoke_all_for(&mut self, user_id: &str) {
        self.sessions.retain(|_, uid| uid != user_id);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
