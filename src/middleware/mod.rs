//! OAuth2/OIDC login middleware for Axum.
//!
//! Mounts the authorization-code flow against the identity provider,
//! keeps the verified profile in a server-side session, and gates the
//! protected user page.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use booksmith::middleware::{AuthConfig, MemorySessionStore, auth_routes};
//! use booksmith::views::Views;
//!
//! // 1. Configure from environment (AUTH0_DOMAIN, AUTH0_CLIENT_ID, ...)
//! let config = AuthConfig::from_env()?;
//!
//! // 2. One session store for the whole process
//! let sessions = Arc::new(MemorySessionStore::new());
//!
//! // 3. Mount /login, /callback, /logout and the gated /user page
//! let app = axum::Router::new()
//!     .merge(auth_routes(config, sessions, Arc::new(Views::new()?)));
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod session;
mod state;
mod traits;

pub use config::AuthConfig;
pub use error::AuthError;
pub use routes::auth_routes;
pub use session::{ACCESS_TOKEN_KEY, MemorySessionStore, PROFILE_KEY, STATE_KEY, Session};
pub use traits::{Authenticator, BoxError, SessionStore};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
