pub mod convert;
pub mod etl;
pub mod extractor;
pub mod ingest_pipeline;
pub mod metadata_generator;
pub mod nl2query;
pub mod prompts;
pub mod registry;
pub mod sources;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{IngestBatch, LoadReport, RawPayload};
pub use crate::domain::ports::{ChatClient, ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
