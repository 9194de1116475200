pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{
    llm::{OpenAiChatClient, OpenAiConfig},
    store::MetricStore,
};
pub use config::{cli::LocalStorage, AppConfig};

#[cfg(feature = "cli")]
pub use config::{Cli, Command};

pub use core::{
    etl::EtlEngine, ingest_pipeline::IngestPipeline, nl2query::TsQuery, registry::ExtractorRegistry,
};
pub use domain::model::QueryOutcome;
pub use utils::error::{MetricsError, Result};
