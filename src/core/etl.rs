use crate::core::{BatchReport, Pipeline};
use crate::utils::error::Result;
use std::time::Instant;

/// Runs a pipeline once: prepare, extract, transform, load. Any error aborts the batch;
/// per-record photo problems travel inside the report instead.
pub struct BatchEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> BatchEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn run(&self) -> Result<BatchReport> {
        let started = Instant::now();
        tracing::info!("Starting ID card generation");

        let prepared = self.pipeline.prepare()?;

        tracing::info!("Reading roster...");
        let roster = self.pipeline.extract()?;
        tracing::info!("Read {} student records", roster.len());

        tracing::info!("Rendering cards...");
        let result = self.pipeline.transform(&prepared, roster)?;
        tracing::info!(
            "Rendered {} cards ({} skipped, {} photo warnings)",
            result.cards.len(),
            result.skipped.len(),
            result.warnings.len()
        );

        tracing::info!("Writing cards...");
        let report = self.pipeline.load(result)?;
        tracing::info!(
            "Wrote {} cards to {} in {:?}",
            report.cards.len(),
            report.output_dir.display(),
            started.elapsed()
        );

        Ok(report)
    }
}
