use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

/// Runs a pipeline's extract, transform and load stages in order.
pub struct FormatEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> FormatEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("🚀 Starting formatting run");

        // Extract
        let stage = Instant::now();
        let raw_data = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} records in {:?}",
            raw_data.len(),
            stage.elapsed()
        );

        // Transform
        let stage = Instant::now();
        let result = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "🔄 Formatted {} records as '{}' for '{}' ({} incomplete) in {:?}",
            result.processed_records.len(),
            result.cad_system,
            result.tool,
            result.incomplete_records.len(),
            stage.elapsed()
        );

        // Load
        let stage = Instant::now();
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("💾 Output saved to {} in {:?}", output_path, stage.elapsed());

        tracing::info!("✅ Run finished in {:?}", started.elapsed());
        Ok(output_path)
    }
}
