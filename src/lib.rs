#![doc = include_str!("../README.md")]

pub mod app;
pub mod book;
pub mod config;
pub mod csrf;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod oauth;
pub mod token;
pub mod types;
pub mod views;

// Re-exports for convenient access
pub use error::Error;
pub use oauth::{AuthClient, OAuthConfig, TokenSet};
pub use token::IdTokenVerifier;
pub use types::{Profile, SessionId};
