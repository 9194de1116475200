use crate::core::extractor::GenericExtractor;
use crate::domain::model::MappingRules;
use crate::utils::error::Result;
use crate::utils::formatters::MetricNameFormat;
use serde_json::Value;
use std::collections::HashMap;

/// Extractors keyed by payload `type`. Untyped payloads share the `""` key.
#[derive(Debug, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, GenericExtractor>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, data_type: impl Into<String>, mapping_rules: MappingRules) {
        let data_type = data_type.into();
        tracing::debug!("Registering extractor for type '{}'", data_type);
        self.extractors
            .insert(data_type, GenericExtractor::new(mapping_rules));
    }

    pub fn get_extractor(&self, data_type: &str) -> Option<&GenericExtractor> {
        self.extractors.get(data_type)
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Infers mapping rules from `sample` and registers them under `data_type`.
    pub fn register_from_sample(
        &mut self,
        data_type: &str,
        sample: &Value,
        entity_identifier: &str,
        timestamp_field: &str,
        name_format: MetricNameFormat,
    ) -> Result<MappingRules> {
        let mapping_rules =
            GenericExtractor::infer_mapping(sample, entity_identifier, timestamp_field, name_format)?;
        tracing::info!(
            "📐 Inferred {} metrics for type '{}' at {}",
            mapping_rules.metrics.len(),
            data_type,
            mapping_rules.entity_base_path
        );
        self.register(data_type, mapping_rules.clone());
        Ok(mapping_rules)
    }
}
