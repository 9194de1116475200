use crate::domain::model::ChatOptions;
use crate::domain::ports::ChatClient;
use crate::utils::error::{MetricsError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replies with canned responses in order and records every prompt.
pub(crate) struct ScriptedChat {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    models: Mutex<Vec<Option<String>>>,
}

impl ScriptedChat {
    pub(crate) fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn models(&self) -> Vec<Option<String>> {
        self.models.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn chat(&self, prompt: &str, options: &ChatOptions) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.models.lock().unwrap().push(options.model.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| MetricsError::ProcessingError {
                message: "scripted chat ran out of replies".to_string(),
            })
    }
}
