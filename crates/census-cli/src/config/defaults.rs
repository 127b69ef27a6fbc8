use super::models::DeciderMethod;
use symcensus::core::consensus::histogram::OverflowPolicy;
use symcensus::core::significance::DEFAULT_ANGLE_TOLERANCE;
use symcensus::engine::collaborators::DEFAULT_DETECTION_TOLERANCE;
use symcensus::engine::config::FailurePolicy;
use symcensus::engine::runner::DEFAULT_ITEM_TIMEOUT;

pub struct DefaultsConfig {
    pub checkpoint_interval: usize,
    pub item_timeout_seconds: f64,
    pub failure_policy: FailurePolicy,
    pub tolerate_order_failure: bool,
    pub max_order: u32,
    pub detection_tolerance: f64,
    pub angle_tolerance: f64,
    pub method_with_matrix: DeciderMethod,
    pub method_without_matrix: DeciderMethod,
    pub overflow: OverflowPolicy,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 50,
            item_timeout_seconds: DEFAULT_ITEM_TIMEOUT.as_secs_f64(),
            failure_policy: FailurePolicy::Record,
            tolerate_order_failure: true,
            max_order: 8,
            detection_tolerance: DEFAULT_DETECTION_TOLERANCE,
            angle_tolerance: DEFAULT_ANGLE_TOLERANCE,
            method_with_matrix: DeciderMethod::ErrorKernel,
            method_without_matrix: DeciderMethod::Majority,
            overflow: OverflowPolicy::Exclude,
        }
    }
}
