//! Book generation: validates the request, builds the prompt and forwards it
//! to the Qwen text-generation API.

mod client;
mod error;
mod prompt;
mod routes;

pub use client::QwenClient;
pub use error::{BookError, GenerationError};
pub use prompt::{BookRequest, Message, build_messages, system_prompt};
pub use routes::{BookState, book_routes};
