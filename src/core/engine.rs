use crate::domain::model::RunSummary;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct HistogramEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> HistogramEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn run(&self) -> Result<RunSummary> {
        tracing::info!("Starting age histogram run");
        self.monitor.log_stats("Before pipeline");

        let summary = self.pipeline.run()?;

        self.monitor.log_stats("After pipeline");
        if let Some(err) = &summary.source_error {
            tracing::debug!("Input was not fully read: {}", err);
        }
        tracing::info!(
            "Histogram ready: {} buckets, {} dates counted",
            summary.histogram.len(),
            summary.histogram.total()
        );
        self.monitor.log_final_stats();

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemorySource;
    use crate::config::settings::PipelineSettings;
    use crate::core::pipeline::HistogramPipeline;
    use crate::domain::model::{CivilDate, PipelineState};

    #[test]
    fn test_engine_runs_pipeline_to_done() {
        let pipeline = HistogramPipeline::new(
            MemorySource::from_lines(["2004-11-01", "2005-01-06"]),
            PipelineSettings {
                workers: 2,
                queue_capacity: 4,
                ..PipelineSettings::default()
            },
            CivilDate::new(2024, 11, 1),
        );
        let engine = HistogramEngine::new(pipeline);

        let summary = engine.run().unwrap();

        assert_eq!(summary.histogram.total(), 2);
        assert_eq!(engine.pipeline().state(), PipelineState::Done);
    }
}
