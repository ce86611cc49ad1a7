use metrics::{counter, histogram};
use std::time::Duration;

/// Thin wrapper over the metrics facade for the generation pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineMetrics;

impl PipelineMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_generation(&self) {
        counter!("card_generations_total").increment(1);
    }

    pub fn record_stage_failure(&self, stage: &str) {
        counter!("card_generation_failures_total", "stage" => stage.to_string()).increment(1);
    }

    pub fn record_points_deducted(&self, points: u64) {
        counter!("card_points_deducted_total").increment(points);
    }

    pub fn record_points_refunded(&self, points: u64) {
        counter!("card_points_refunded_total").increment(points);
    }

    pub fn record_render_duration(&self, duration: Duration) {
        histogram!("card_render_duration_seconds").record(duration.as_secs_f64());
    }
}
