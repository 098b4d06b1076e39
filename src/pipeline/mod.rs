//! Query pipeline
//!
//! One user question runs strictly in sequence:
//!
//! 1. [`IntentRouter`] asks the LLM for `{endpoint, queryParams}`
//! 2. [`Dispatcher`] validates the endpoint, normalizes parameters and
//!    calls the analytics provider
//! 3. [`Summarizer`] asks the LLM to explain the payload
//!
//! The whole chain runs under one deadline.

mod dispatch;
mod fence;
mod heading;
mod router;
mod summarize;
#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::analytics::{AnalyticsApi, AnalyticsClient, EndpointName};
use crate::config::Config;
use crate::llm::{GeminiClient, TextCompletion};
use crate::{Error, Result};

pub use dispatch::{Dispatched, Dispatcher};
pub use fence::strip_code_fence;
pub use heading::{HeadingGenerator, MAX_HEADING_CHARS, clean_heading};
pub use router::{IntentRouter, RoutedQuery};
pub use summarize::{AxisValue, GraphSpec, SummaryResult, Summarizer};

/// Response for one chat query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Endpoint that answered
    pub source: EndpointName,
    /// Raw provider payload
    pub data: Value,
    /// Plain-language explanation
    pub summary: String,
    /// Optional chart
    pub graph: Option<GraphSpec>,
}

/// The routing, dispatch and summarizing stages wired together.
pub struct Pipeline {
    router: IntentRouter,
    dispatcher: Dispatcher,
    summarizer: Summarizer,
    headings: HeadingGenerator,
    deadline: Duration,
}

impl Pipeline {
    /// Wire the pipeline over explicit collaborators
    pub fn new(
        llm: Arc<dyn TextCompletion>,
        api: Arc<dyn AnalyticsApi>,
        deadline: Duration,
    ) -> Self {
        Self {
            router: IntentRouter::new(Arc::clone(&llm)),
            dispatcher: Dispatcher::new(api),
            summarizer: Summarizer::new(Arc::clone(&llm)),
            headings: HeadingGenerator::new(llm),
            deadline,
        }
    }

    /// Build the production pipeline (Gemini + bitsCrunch) from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm: Arc<dyn TextCompletion> = Arc::new(GeminiClient::new(&config.llm)?);
        let api: Arc<dyn AnalyticsApi> = Arc::new(AnalyticsClient::new(&config.analytics)?);
        Ok(Self::new(llm, api, config.server.request_timeout))
    }

    async fn with_deadline<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        if let Ok(result) = tokio::time::timeout(self.deadline, fut).await {
            result
        } else {
            warn!(stage = what, deadline = ?self.deadline, "Deadline expired");
            Err(Error::Timeout(what.to_string()))
        }
    }

    /// Route only; no analytics call
    pub async fn route(&self, query: &str) -> Result<RoutedQuery> {
        self.with_deadline("route", self.router.route(query)).await
    }

    /// Route and fetch, without summarizing
    pub async fn fetch(&self, query: &str) -> Result<Dispatched> {
        self.with_deadline("fetch", async {
            let routed = self.router.route(query).await?;
            self.dispatcher.dispatch(&routed).await
        })
        .await
    }

    /// Full chain: route, fetch, summarize
    pub async fn query(&self, query: &str) -> Result<QueryResponse> {
        self.with_deadline("query", async {
            let routed = self.router.route(query).await?;
            let Dispatched { endpoint, data } = self.dispatcher.dispatch(&routed).await?;
            let SummaryResult { summary, graph } =
                self.summarizer.summarize(query, &data).await?;

            info!(
                endpoint = %endpoint,
                graph = graph.is_some(),
                summary_chars = summary.len(),
                "Query answered"
            );
            Ok(QueryResponse {
                source: endpoint,
                data,
                summary,
                graph,
            })
        })
        .await
    }

    /// Fetch data for `query`, then answer `question` from it in plain text
    pub async fn answer(&self, question: &str, query: &str) -> Result<String> {
        if question.trim().is_empty() || query.trim().is_empty() {
            return Err(Error::Validation(
                "Missing question or query field".to_string(),
            ));
        }
        self.with_deadline("summarize", async {
            let routed = self.router.route(query).await?;
            let Dispatched { data, .. } = self.dispatcher.dispatch(&routed).await?;
            self.summarizer.answer(question, &data).await
        })
        .await
    }

    /// Session heading for `query`
    pub async fn heading(&self, query: &str) -> Result<String> {
        self.with_deadline("heading", self.headings.generate(query))
            .await
    }
}
