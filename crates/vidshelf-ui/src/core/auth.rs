//! Authentication primitives shared across the client.
//!
//! # Design
//! - Keep auth state as simple data; the session is the only mutable holder.
//! - Treat blank credentials as unauthenticated.
//! - Header encoding lives here so every transport sends the same thing.

use std::cell::RefCell;
use std::rc::Rc;

/// Header carrying an API key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Header carrying a session token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Credentials attached to outbound requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    /// Static API key.
    ApiKey(String),
    /// Session token issued by the backend login flow.
    Token(String),
    /// No credentials.
    Anonymous,
}

impl AuthState {
    #[must_use]
    /// Whether this auth state contains usable credentials.
    pub fn has_credentials(&self) -> bool {
        match self {
            Self::ApiKey(value) | Self::Token(value) => !value.trim().is_empty(),
            Self::Anonymous => false,
        }
    }

    /// Header name/value for the credentials, if any.
    #[must_use]
    pub fn header(&self) -> Option<(&'static str, String)> {
        if !self.has_credentials() {
            return None;
        }
        match self {
            Self::ApiKey(key) => Some((API_KEY_HEADER, key.trim().to_string())),
            Self::Token(token) => Some((AUTHORIZATION_HEADER, format!("Token {}", token.trim()))),
            Self::Anonymous => None,
        }
    }
}

/// Shared handle on the current credentials.
///
/// Cloning shares the same slot; clearing through any clone logs every holder out.
#[derive(Clone, Debug)]
pub struct Session {
    state: Rc<RefCell<AuthState>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(AuthState::Anonymous)
    }
}

impl Session {
    /// Session seeded with credentials.
    #[must_use]
    pub fn new(state: AuthState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Session seeded from an optional API key.
    #[must_use]
    pub fn from_api_key(api_key: Option<&str>) -> Self {
        api_key.map_or_else(Self::default, |key| {
            Self::new(AuthState::ApiKey(key.to_string()))
        })
    }

    /// Current credentials.
    #[must_use]
    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Replace the credentials.
    pub fn set(&self, state: AuthState) {
        *self.state.borrow_mut() = state;
    }

    /// Drop the credentials.
    pub fn clear(&self) {
        self.set(AuthState::Anonymous);
    }

    /// Whether usable credentials are present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().has_credentials()
    }

    /// Header for the current credentials.
    #[must_use]
    pub fn auth_header(&self) -> Option<(&'static str, String)> {
        self.state.borrow().header()
    }
}
