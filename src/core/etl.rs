use crate::core::Pipeline;
use crate::domain::model::LoadReport;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<LoadReport> {
        tracing::info!("🚀 Starting ETL process...");

        tracing::info!("📥 Extracting data...");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("Extracted {} payloads", raw_data.len());

        tracing::info!("🔄 Transforming data...");
        let batch = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "Transformed {} documents, {} metadata entries",
            batch.documents.len(),
            batch.metadata.len()
        );

        tracing::info!("💾 Loading data...");
        let report = self.pipeline.load(batch).await?;
        tracing::info!(
            inserted = report.inserted,
            metadata_initialized = report.metadata_initialized,
            metadata_upserted = report.metadata_upserted,
            "✅ ETL process completed"
        );

        Ok(report)
    }
}
