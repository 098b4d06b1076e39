//! Deterministic stand-ins for the hosted services

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::analytics::{AnalyticsApi, NormalizedRequest};
use crate::llm::{Message, TextCompletion};
use crate::{Error, Result};

/// Returns canned completions in order and records every prompt.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextCompletion for ScriptedLlm {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Llm("script exhausted".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Answers every request with a fixed payload and records what was asked.
pub struct RecordingApi {
    payload: Value,
    requests: Mutex<Vec<NormalizedRequest>>,
}

impl RecordingApi {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<NormalizedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsApi for RecordingApi {
    async fn fetch(&self, request: &NormalizedRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.payload.clone())
    }
}
