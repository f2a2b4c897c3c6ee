//! Scripted language model

use super::LanguageModel;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Outcome queued for the next call
#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail(String),
}

/// Language model with queued replies, no network
///
/// Each call pops the next scripted outcome. With nothing queued it echoes a
/// short canned answer so local development works without credentials.
#[derive(Debug, Default)]
pub struct MockLanguageModel {
    script: Mutex<VecDeque<Scripted>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(Scripted::Reply(reply.into()));
        self
    }

    /// Queue a failure
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Fail(message.into()));
        self
    }

    /// Number of `generate` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn push(&self, outcome: Scripted) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => Err(AppError::LanguageModel { message }),
            None => Ok("This is a general response from the mock language model. \
                        Please consult a healthcare professional."
                .to_string()),
        }
    }

    fn model_name(&self) -> &str {
        "mock-language-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_outcomes_in_order() {
        let model = MockLanguageModel::new()
            .with_reply("first")
            .with_failure("down");

        assert_eq!(model.generate("a").await.unwrap(), "first");
        assert!(matches!(
            model.generate("b").await,
            Err(AppError::LanguageModel { .. })
        ));
        assert!(model.generate("c").await.is_ok());
        assert_eq!(model.call_count(), 3);
        assert_eq!(model.prompts(), vec!["a", "b", "c"]);
    }
}
