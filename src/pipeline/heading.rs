//! Short conversation titles for new chat sessions

use std::sync::Arc;

use crate::llm::{Message, TextCompletion};
use crate::{Error, Result};

/// Longest heading kept, in characters
pub const MAX_HEADING_CHARS: usize = 50;

const HEADING_PROMPT: &str = r#"You are a helpful assistant that creates short, descriptive headings for NFT analytics chat conversations.

Given a user's query about NFT analytics, create a concise heading (maximum 50 characters) that summarizes what the user is asking about.

Examples:
- "Show me BAYC sales trends" -> "BAYC Sales Trends"
- "What's the floor price of CryptoPunks?" -> "CryptoPunks Floor Price"
- "Analyze whale activity in Doodles" -> "Doodles Whale Activity"
- "Compare volume between collections" -> "Collection Volume Comparison"

Make the heading:
- Short and descriptive (max 50 chars)
- Focus on the main topic/collection
- Use title case
- Avoid technical jargon
- Be specific but concise

Return only the heading text, nothing else.
"#;

/// Generates session headings from the first user query.
pub struct HeadingGenerator {
    llm: Arc<dyn TextCompletion>,
}

impl HeadingGenerator {
    /// Create a generator backed by `llm`
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }

    /// Ask the model for a heading for `query`
    pub async fn generate(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("Query is required".to_string()));
        }

        let raw = self
            .llm
            .complete(&[
                Message::system(HEADING_PROMPT),
                Message::user(format!("User query: {query}")),
            ])
            .await?;
        Ok(clean_heading(&raw))
    }
}

/// Trim, drop one leading and one trailing quote, cap the length.
#[must_use]
pub fn clean_heading(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_suffix(['"', '\''])
        .unwrap_or(trimmed);
    trimmed.chars().take(MAX_HEADING_CHARS).collect()
}
