//! Second LLM stage: raw analytics payload to a plain-English explanation.
//!
//! Summarization never fails on bad model output. If the completion is not
//! JSON, the whole text becomes the summary and no chart is returned.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::fence::strip_code_fence;
use crate::Result;
use crate::llm::{Message, TextCompletion};

const SUMMARY_PROMPT: &str = r#"You are an expert NFT analytics explainer. Your job is to turn complex NFT analytics data into a summary that is:
- Extremely easy to understand for someone with no technical or NFT background.
- Written in plain, conversational English.
- Focused on the most important trends, changes, and what they mean for a curious user.
- Uses analogies, simple comparisons, and avoids jargon.
- Always highlight and explain the most important numbers from the data (such as sales, volume, counts, or changes), and present them in a way that's easy for the user to grasp.
- If there are patterns, spikes, or drops, explain them in a way a friend would (e.g., "There was a big jump in sales, like a sudden rush at a store sale").
- If the data is mostly flat or uneventful, say so in a friendly way.
- If the data is insufficient, say so.

Additionally, decide if a simple line chart or graph would help the user understand the data. If so, select two arrays from the data (for example, time and sales_trend), and return them as a JSON object with keys "graph": { "x": [...], "x_label": "...", "y": [...], "y_label": "..." }. If a graph is not needed, return "graph": null.

Be brief, friendly, and make the summary as clear and approachable as possible. Always output a valid JSON object with keys: "summary" (string) and "graph" (object or null).
"#;

const ANSWER_PROMPT: &str = "You are a helpful assistant that summarizes NFT analytics data for users. Given a user question and the relevant data, provide a concise, clear, and accurate answer to the user's question based only on the data provided. If the data is insufficient, say so.";

/// One chart axis point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisValue {
    /// Numeric point
    Number(serde_json::Number),
    /// Label or timestamp
    Text(String),
}

/// Two-axis chart data chosen by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    /// X axis values
    pub x: Vec<AxisValue>,
    /// X axis label
    pub x_label: String,
    /// Y axis values
    pub y: Vec<AxisValue>,
    /// Y axis label
    pub y_label: String,
}

/// Explanation plus optional chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Plain-language explanation
    pub summary: String,
    /// Chart data; `None` unless every field is present
    pub graph: Option<GraphSpec>,
}

impl SummaryResult {
    /// Interpret model output. Never fails.
    #[must_use]
    pub fn from_completion(raw: &str) -> Self {
        let cleaned = strip_code_fence(raw);
        let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(&cleaned) else {
            debug!("Summary output is not a JSON object, passing raw text through");
            return Self {
                summary: raw.to_string(),
                graph: None,
            };
        };

        let summary = match object.remove("summary") {
            Some(Value::String(s)) => s,
            _ => cleaned.clone(),
        };

        let graph = match object.remove("graph") {
            None | Some(Value::Null) => None,
            Some(value) => serde_json::from_value::<GraphSpec>(value)
                .inspect_err(|e| warn!(error = %e, "Dropping partial graph from summary"))
                .ok(),
        };

        Self { summary, graph }
    }
}

/// Turns analytics payloads into user-facing text.
pub struct Summarizer {
    llm: Arc<dyn TextCompletion>,
}

impl Summarizer {
    /// Create a summarizer backed by `llm`
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }

    fn user_prompt(question: &str, data: &Value) -> String {
        let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
        format!("User question: {question}\n\nData: {pretty}")
    }

    /// Explain `data` in the context of `question`, possibly with a chart.
    ///
    /// Only transport failures propagate; unusable output falls back to
    /// the raw completion text.
    pub async fn summarize(&self, question: &str, data: &Value) -> Result<SummaryResult> {
        let messages = [
            Message::system(SUMMARY_PROMPT),
            Message::user(Self::user_prompt(question, data)),
        ];
        let raw = self.llm.complete(&messages).await?;
        Ok(SummaryResult::from_completion(&raw))
    }

    /// Short direct answer to `question` from `data`, as plain text
    pub async fn answer(&self, question: &str, data: &Value) -> Result<String> {
        let messages = [
            Message::system(ANSWER_PROMPT),
            Message::user(Self::user_prompt(question, data)),
        ];
        self.llm.complete(&messages).await
    }
}
