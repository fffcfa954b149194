//! Scripted engine for pipeline tests. No network calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::ExtractionEngine;
use crate::error::EngineError;

enum Reply {
    Ok(Value),
    Fail(String),
}

/// Returns a canned reply per URL and records every call.
#[derive(Default, Clone)]
pub struct ScriptedEngine {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, url: &str, value: Value) -> Self {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Ok(value));
        self
    }

    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Fail(message.to_string()));
        self
    }

    /// URLs in the order they were requested.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionEngine for ScriptedEngine {
    async fn extract(&self, url: &str, _instruction: &str) -> Result<Value, EngineError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.replies.lock().unwrap().get(url) {
            Some(Reply::Ok(value)) => Ok(value.clone()),
            Some(Reply::Fail(message)) => Err(EngineError::Fetch(message.clone())),
            None => Err(EngineError::EmptyPage {
                url: url.to_string(),
            }),
        }
    }
}
