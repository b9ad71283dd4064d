use std::path::PathBuf;

use crate::error::Error;

const DEFAULT_PORT: u16 = 3000;

/// Process-level settings that are not part of the login flow.
///
/// Login settings live in [`AuthConfig`](crate::middleware::AuthConfig).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Fallback key for `/generate-book` requests that carry none.
    pub qwen_api_key: Option<String>,
    pub qwen_base_url: Option<String>,
    /// Overrides the default `qwen-plus` model.
    pub qwen_model: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            qwen_api_key: None,
            qwen_base_url: None,
            qwen_model: None,
        }
    }
}

impl AppConfig {
    /// Read `PORT`, `QWEN_API_KEY`, `QWEN_BASE_URL` and `QWEN_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `PORT` is set but not a valid port number.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("PORT={raw}: {e}")))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            qwen_api_key: non_empty("QWEN_API_KEY"),
            qwen_base_url: non_empty("QWEN_BASE_URL"),
            qwen_model: non_empty("QWEN_MODEL"),
        })
    }
}

/// Load `.env` from the working directory or its parents.
///
/// A missing file is not an error (`Ok(None)`); unreadable or malformed files are.
///
/// # Errors
///
/// Returns the [`dotenvy::Error`] for anything but a missing file.
pub fn load_env_file() -> Result<Option<PathBuf>, dotenvy::Error> {
    missing_is_ok(dotenvy::dotenv())
}

fn missing_is_ok<T>(result: Result<T, dotenvy::Error>) -> Result<Option<T>, dotenvy::Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
