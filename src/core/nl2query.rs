//! Question answering over the metric store.
//!
//! One chat call turns the question into an [`EntityFilter`], the store is
//! queried with it, and a second chat call writes the answer from the
//! retrieved documents and the metric's metadata.

use crate::adapters::store::MetricStore;
use crate::core::prompts::{render, ANSWER_TEMPLATE, EXTRACT_QUERY_TEMPLATE};
use crate::domain::model::{ChatOptions, EntityFilter, QueryOutcome};
use crate::domain::ports::{ChatClient, Storage};
use crate::utils::error::Result;
use crate::utils::json_extract::extract_json;
use crate::utils::time::format_current_time;
use std::sync::Arc;

pub const DEFAULT_QUERY_LIMIT: usize = 5;

pub struct TsQuery<S: Storage> {
    store: Arc<MetricStore<S>>,
    chat: Arc<dyn ChatClient>,
    model: String,
    limit: usize,
}

impl<S: Storage> TsQuery<S> {
    pub fn new(store: Arc<MetricStore<S>>, chat: Arc<dyn ChatClient>, model: impl Into<String>) -> Self {
        Self {
            store,
            chat,
            model: model.into(),
            limit: DEFAULT_QUERY_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn store(&self) -> &MetricStore<S> {
        &self.store
    }

    fn chat_options(&self) -> ChatOptions {
        ChatOptions::with_model(self.model.clone())
    }

    /// Extracts the entity and filter for `question`. `None` when the reply
    /// holds no usable JSON.
    pub async fn generate_query(&self, question: &str) -> Result<Option<EntityFilter>> {
        let metadata = serde_json::to_string(&self.store.all_metadata().await?)?;
        let prompt = render(
            EXTRACT_QUERY_TEMPLATE,
            &[("metadata", metadata.as_str()), ("question", question)],
        );
        tracing::info!("{}", prompt);

        let response = self.chat.chat(&prompt, &self.chat_options()).await?;
        let entity_filter = extract_json::<EntityFilter>(&response);
        tracing::info!("Extracted entity and filters: {:?}", entity_filter);
        Ok(entity_filter)
    }

    pub async fn get_response(&self, question: &str) -> Result<QueryOutcome> {
        let Some(entity_filter) = self.generate_query(question).await? else {
            return Ok(QueryOutcome::NoEntity);
        };
        let Some(metric) = entity_filter.metric() else {
            return Ok(QueryOutcome::NoEntity);
        };
        if entity_filter.entity.trim().is_empty() {
            return Ok(QueryOutcome::NoEntity);
        }

        let Some(metadata) = self.store.find_metadata(metric).await? else {
            return Ok(QueryOutcome::NoMetadata {
                entity: entity_filter.entity,
            });
        };

        let documents = self
            .store
            .query_latest(Some(&entity_filter.entity), &entity_filter.filter, self.limit)
            .await?;
        if documents.is_empty() {
            return Ok(QueryOutcome::NoData);
        }

        let metadata = serde_json::to_string(&metadata)?;
        let context = serde_json::to_string(&documents)?;
        let current_time = format_current_time();
        let prompt = render(
            ANSWER_TEMPLATE,
            &[
                ("metadata", metadata.as_str()),
                ("context", context.as_str()),
                ("current_time", current_time.as_str()),
                ("question", question),
            ],
        );
        tracing::info!("{}", prompt);

        let answer = self.chat.chat(&prompt, &self.chat_options()).await?;
        Ok(QueryOutcome::Answer(answer))
    }
}
