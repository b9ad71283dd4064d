use serde::{Deserialize, Serialize};

use super::error::BookError;

/// Body of `POST /generate-book`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub chapters: i64,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl BookRequest {
    /// Reject empty title/description and non-positive chapter counts.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::MissingFields`].
    pub fn validate(&self) -> Result<(), BookError> {
        if self.title.is_empty() || self.description.is_empty() || self.chapters <= 0 {
            return Err(BookError::MissingFields);
        }
        Ok(())
    }

    /// The key sent with the request, if it is non-empty.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// One chat message sent to the text-generation API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Fixed system prompt describing the book to write.
#[must_use]
pub fn system_prompt(title: &str, description: &str, chapters: i64) -> String {
    format!(
        "You are a professional book writer.
Generate a complete book with the following details:
- Title: {title}
- Description: {description}
- Number of chapters: {chapters}

The book should have a coherent narrative that follows the description.
Each chapter should have a title and substantial content.
Format the book with proper Markdown, including headings for chapters.
Create a compelling opening and satisfying conclusion."
    )
}

/// System + user messages for a validated request.
#[must_use]
pub fn build_messages(request: &BookRequest) -> Vec<Message> {
    vec![
        Message::system(system_prompt(
            &request.title,
            &request.description,
            request.chapters,
        )),
        Message::user(format!(
            "Please generate a complete book titled '{}' with {} chapters based on this description: {}",
            request.title, request.chapters, request.description
        )),
    ]
}
