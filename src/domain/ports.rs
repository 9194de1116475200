use crate::domain::model::{ChatOptions, IngestBatch, LoadReport, RawPayload, SourceConfig};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn store_uri(&self) -> &str;
    fn model(&self) -> &str;
    fn query_limit(&self) -> usize;
    fn sources(&self) -> &[SourceConfig];
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends `prompt` as the final user message and returns the reply text.
    async fn chat(&self, prompt: &str, options: &ChatOptions) -> Result<String>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<RawPayload>>;
    async fn transform(&self, data: Vec<RawPayload>) -> Result<IngestBatch>;
    async fn load(&self, batch: IngestBatch) -> Result<LoadReport>;
}
