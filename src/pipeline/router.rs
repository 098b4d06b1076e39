//! Intent routing: free text to `{endpoint, queryParams}` via the LLM.

use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::fence::strip_code_fence;
use crate::analytics::ENDPOINTS;
use crate::llm::{Message, TextCompletion};
use crate::{Error, Result};

/// The router's decision, before the endpoint name is validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutedQuery {
    /// Endpoint name as the model wrote it
    pub endpoint: Option<String>,
    /// Query parameters as the model wrote them, after light normalization
    #[serde(rename = "queryParams", default)]
    pub query_params: Map<String, Value>,
}

static SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(build_system_prompt);

fn build_system_prompt() -> String {
    let mut endpoints = String::new();
    for spec in &ENDPOINTS {
        let rule = match spec.sort_by {
            [] => "sort_by is not required or used for this endpoint.".to_string(),
            [only] => format!("sort_by must be \"{only}\" only."),
            keys => format!(
                "sort_by must be one of: [{}]",
                keys.iter()
                    .map(|k| format!("\"{k}\""))
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        };
        let _ = writeln!(endpoints, "   - {}: {} - {}", spec.name, spec.title, rule);
    }

    let names = ENDPOINTS
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a smart assistant that helps route NFT-related queries to an internal API system.
You will be given a user question. Your job is to:
1. Decide which bitsCrunch API endpoint is best for the user's question. The available endpoints are:
{endpoints}2. Output a JSON object containing:
  - endpoint: string (one of: {names})
  - queryParams: object of key-value pairs such as contract_address, blockchain, time_range, limit, sort_by, etc.

Only output valid JSON. Do not include explanations or extra formatting.
"
    )
}

/// Classifies a user question into one analytics endpoint plus parameters.
pub struct IntentRouter {
    llm: Arc<dyn TextCompletion>,
}

impl IntentRouter {
    /// Create a router backed by `llm`
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }

    /// The fixed routing prompt, listing every endpoint and its sort keys
    #[must_use]
    pub fn system_prompt() -> &'static str {
        &SYSTEM_PROMPT
    }

    /// Ask the model to route `query`.
    ///
    /// The endpoint name is not checked here; dispatch rejects unknown names.
    pub async fn route(&self, query: &str) -> Result<RoutedQuery> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("Missing query field".to_string()));
        }

        let messages = [
            Message::system(Self::system_prompt()),
            Message::user(format!("User: {query}")),
        ];
        let raw = self.llm.complete(&messages).await?;

        let routed = Self::parse(&raw)?;
        debug!(
            model = %self.llm.model_name(),
            endpoint = routed.endpoint.as_deref().unwrap_or("<missing>"),
            params = ?routed.query_params,
            "Routed query"
        );
        Ok(routed)
    }

    /// Parse model output into a [`RoutedQuery`].
    ///
    /// A surrounding Markdown fence is ignored. Output that is not JSON is a
    /// routing error carrying the raw text. A bare `contract_address` string
    /// becomes a one-element list and a numeric `limit` string becomes an
    /// integer.
    pub fn parse(raw: &str) -> Result<RoutedQuery> {
        let cleaned = strip_code_fence(raw);
        let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
            warn!(error = %e, raw = %raw, "Invalid JSON from LLM");
            Error::routing("Invalid JSON from LLM", raw)
        })?;

        let Value::Object(mut object) = value else {
            return Ok(RoutedQuery::default());
        };

        let endpoint = match object.remove("endpoint") {
            None => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };

        let mut query_params = match object.remove("queryParams") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        if let Some(Value::String(address)) = query_params.get("contract_address").cloned() {
            query_params.insert(
                "contract_address".to_string(),
                Value::Array(vec![Value::String(address)]),
            );
        }

        let numeric_limit = query_params
            .get("limit")
            .and_then(Value::as_str)
            .and_then(|s| s.trim().parse::<i64>().ok());
        if let Some(limit) = numeric_limit {
            query_params.insert("limit".to_string(), Value::from(limit));
        }

        Ok(RoutedQuery {
            endpoint,
            query_params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedLlm;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_prompt_lists_every_endpoint_and_rule() {
        let prompt = IntentRouter::system_prompt();
        for spec in &ENDPOINTS {
            assert!(prompt.contains(&format!("- {}: ", spec.name)), "{}", spec.name);
            for key in spec.sort_by {
                assert!(prompt.contains(&format!("\"{key}\"")), "{key}");
            }
        }
        assert!(prompt.contains("traits: Collection Traits - sort_by must be \"trait_type\" only."));
        assert!(prompt.contains("metadata: Collection Metadata - sort_by is not required"));
    }

    #[test]
    fn test_fenced_output_parses_like_plain() {
        let plain = r#"{"endpoint": "analytics", "queryParams": {"time_range": "30d"}}"#;
        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(
            IntentRouter::parse(&fenced).unwrap(),
            IntentRouter::parse(plain).unwrap()
        );
    }

    #[test]
    fn test_unparsable_output_keeps_raw_text() {
        let raw = "Sure! I think you want the whales endpoint.";
        match IntentRouter::parse(raw) {
            Err(Error::Routing { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected routing error, got {other:?}"),
        }
    }

    #[test]
    fn test_contract_address_wrapped_and_limit_parsed() {
        let routed = IntentRouter::parse(
            r#"{"endpoint": "whales", "queryParams": {"contract_address": "0xabc", "limit": "10", "sort_by": "buy_volume"}}"#,
        )
        .unwrap();
        assert_eq!(routed.endpoint.as_deref(), Some("whales"));
        assert_eq!(
            Value::Object(routed.query_params),
            json!({"contract_address": ["0xabc"], "limit": 10, "sort_by": "buy_volume"})
        );
    }

    #[test]
    fn test_non_numeric_limit_left_alone() {
        let routed =
            IntentRouter::parse(r#"{"endpoint": "owner", "queryParams": {"limit": "all"}}"#).unwrap();
        assert_eq!(routed.query_params["limit"], json!("all"));
    }

    #[test]
    fn test_non_string_endpoint_kept_verbatim() {
        let routed = IntentRouter::parse(r#"{"endpoint": 7, "queryParams": {}}"#).unwrap();
        assert_eq!(routed.endpoint.as_deref(), Some("7"));

        let routed = IntentRouter::parse(r#"{"endpoint": null}"#).unwrap();
        assert_eq!(routed.endpoint.as_deref(), Some("null"));
    }

    #[test]
    fn test_missing_parts_default() {
        let routed = IntentRouter::parse(r#"{"queryParams": 5}"#).unwrap();
        assert_eq!(routed, RoutedQuery::default());

        let routed = IntentRouter::parse("[1, 2]").unwrap();
        assert_eq!(routed, RoutedQuery::default());
    }

    #[tokio::test]
    async fn test_route_sends_prompt_and_query() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"endpoint": "holders", "queryParams": {}}"#]));
        let router = IntentRouter::new(llm.clone());

        let routed = router.route("  How many holders does Azuki have? ").await.unwrap();
        assert_eq!(routed.endpoint.as_deref(), Some("holders"));

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], Message::system(IntentRouter::system_prompt()));
        assert_eq!(calls[0][1], Message::user("User: How many holders does Azuki have?"));
    }

    #[tokio::test]
    async fn test_route_rejects_blank_query() {
        let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
        let router = IntentRouter::new(llm.clone());

        let err = router.route("   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(llm.calls().is_empty());
    }
}
