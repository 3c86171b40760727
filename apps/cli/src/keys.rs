//! Provider credentials from the environment.

use cogito_orchestrator::{AuthClass, KeyStore};

/// Search provider key.
pub const SEARCH_KEY_ENV: &str = cogito_models::exa::API_KEY_ENV;

/// Image and video provider key.
pub const MEDIA_KEY_ENV: &str = cogito_models::images::API_KEY_ENV;

/// Read a non-blank environment variable
pub fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Key store backed by environment variables.
///
/// Variables are read on every query, so the engine sees keys as they are
/// when a run starts.
#[derive(Debug, Clone)]
pub struct EnvKeyStore {
    search_var: String,
    media_var: String,
}

impl EnvKeyStore {
    /// Store reading the standard variables
    pub fn new() -> Self {
        Self::with_vars(SEARCH_KEY_ENV, MEDIA_KEY_ENV)
    }

    /// Store reading custom variables
    pub fn with_vars(search_var: impl Into<String>, media_var: impl Into<String>) -> Self {
        Self { search_var: search_var.into(), media_var: media_var.into() }
    }
}

impl Default for EnvKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for EnvKeyStore {
    fn is_authorized(&self, class: AuthClass) -> bool {
        match class {
            AuthClass::None => true,
            AuthClass::Search => env_key(&self.search_var).is_some(),
            AuthClass::Media => env_key(&self.media_var).is_some(),
        }
    }
}
