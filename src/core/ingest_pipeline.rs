use crate::adapters::store::MetricStore;
use crate::core::convert::{process_data, ConvertOptions};
use crate::core::registry::ExtractorRegistry;
use crate::core::sources::load_raw_data;
use crate::domain::model::{
    ChatOptions, IngestBatch, LoadReport, MetricMetadata, RawPayload, SourceConfig, SourceFormat,
};
use crate::domain::ports::{ChatClient, ConfigProvider, Pipeline, Storage};
use crate::utils::error::{MetricsError, Result};
use crate::utils::validation::validate_required_field;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

/// Loads the configured `[[sources]]` into the metric store.
pub struct IngestPipeline<S: Storage, C: ConfigProvider> {
    store: Arc<MetricStore<S>>,
    config: C,
    client: Client,
    seed_metadata: bool,
    metadata_chat: Option<Arc<dyn ChatClient>>,
}

impl<S: Storage, C: ConfigProvider> IngestPipeline<S, C> {
    pub fn new(store: Arc<MetricStore<S>>, config: C) -> Self {
        Self {
            store,
            config,
            client: Client::new(),
            seed_metadata: true,
            metadata_chat: None,
        }
    }

    /// Skips seeding the default metadata after loading.
    pub fn skip_metadata(mut self) -> Self {
        self.seed_metadata = false;
        self
    }

    /// Describes metrics of `raw` sources through the LLM while transforming.
    pub fn with_metadata_generator(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.metadata_chat = Some(chat);
        self
    }

    fn source_config(&self, name: &str) -> Result<&SourceConfig> {
        self.config
            .sources()
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| MetricsError::ProcessingError {
                message: format!("Payload from unknown source '{}'", name),
            })
    }

    async fn transform_raw(
        &self,
        source: &SourceConfig,
        payloads: Vec<RawPayload>,
        batch: &mut IngestBatch,
    ) -> Result<()> {
        let entity_field = validate_required_field(
            &format!("sources.{}.entity_field", source.name),
            &source.entity_field,
        )?;

        let mut options = ConvertOptions::new(entity_field.as_str());
        if let Some(timestamp_field) = &source.timestamp_field {
            options = options.timestamp_field(timestamp_field.clone());
        }

        // 每個來源各自一份 registry，未標 type 的 payload 才不會共用 mapping
        let mut registry = ExtractorRegistry::new();
        let chat_options = ChatOptions::with_model(self.config.model());

        for payload in payloads {
            let chat = self
                .metadata_chat
                .as_deref()
                .map(|client| (client, &chat_options));
            let (points, mut schema) = process_data(&payload, &mut registry, &options, chat).await?;

            for point in &points {
                batch
                    .documents
                    .push(stamp_source(serde_json::to_value(point)?, &source.name)?);
            }
            for metadata in &mut schema {
                if !metadata.sources.contains(&source.name) {
                    metadata.sources.push(source.name.clone());
                }
            }
            batch.metadata.extend(schema);
        }

        Ok(())
    }
}

fn split_raw_payloads(source: &SourceConfig, body: Value) -> Vec<RawPayload> {
    let entity_field = source.entity_field.as_deref().unwrap_or_default();

    match body {
        // 直接是紀錄陣列時包成單一 payload
        Value::Array(items)
            if items
                .first()
                .and_then(Value::as_object)
                .is_some_and(|first| first.contains_key(entity_field)) =>
        {
            vec![RawPayload::new(
                &source.name,
                json!({"type": source.name, "data": items}),
            )]
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| RawPayload::new(&source.name, item))
            .collect(),
        other => vec![RawPayload::new(&source.name, other)],
    }
}

fn stamp_source(mut document: Value, source_name: &str) -> Result<Value> {
    if !document.is_object() {
        return Err(MetricsError::ValidationError {
            message: format!("Metric document from '{}' is not an object: {}", source_name, document),
        });
    }
    if let Some(fields) = document.as_object_mut() {
        let has_source = fields
            .get("source")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if !has_source {
            fields.insert("source".to_string(), Value::String(source_name.to_string()));
        }
    }
    Ok(document)
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for IngestPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<RawPayload>> {
        let mut payloads = Vec::new();

        for source in self.config.sources() {
            tracing::debug!("Loading source '{}' from {}", source.name, source.uri);
            let body = load_raw_data(&source.uri, &self.client).await?;

            match source.format {
                SourceFormat::Points => payloads.push(RawPayload::new(&source.name, body)),
                SourceFormat::Raw => payloads.extend(split_raw_payloads(source, body)),
            }
        }

        Ok(payloads)
    }

    async fn transform(&self, data: Vec<RawPayload>) -> Result<IngestBatch> {
        // 確認沒有來源不明的 payload
        for payload in &data {
            self.source_config(&payload.source)?;
        }

        let mut batch = IngestBatch::default();
        for source in self.config.sources() {
            let payloads: Vec<RawPayload> = data
                .iter()
                .filter(|p| p.source == source.name)
                .cloned()
                .collect();
            if payloads.is_empty() {
                continue;
            }

            match source.format {
                SourceFormat::Points => {
                    for payload in payloads {
                        let documents = match payload.body {
                            Value::Array(items) => items,
                            single => vec![single],
                        };
                        for document in documents {
                            batch.documents.push(stamp_source(document, &source.name)?);
                        }
                    }
                }
                SourceFormat::Raw => self.transform_raw(source, payloads, &mut batch).await?,
            }
            tracing::debug!("Processed records from {}", source.name);
        }

        Ok(batch)
    }

    async fn load(&self, batch: IngestBatch) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        if batch.documents.is_empty() {
            tracing::warn!("No metric documents to load");
            return Ok(report);
        }

        let ids = self.store.insert_metrics(batch.documents).await?;
        report.inserted = ids.len();
        tracing::info!("Successfully inserted {} total records into main store", report.inserted);

        if !batch.metadata.is_empty() {
            report.metadata_upserted = self.store.upsert_metadata(&batch.metadata).await?;
        }

        if self.seed_metadata {
            report.metadata_initialized = self
                .store
                .init_metadata(&MetricMetadata::default_seed())
                .await?;
            tracing::info!("Metadata initialized successfully");
        }

        Ok(report)
    }
}
