mod loop_runner;
mod metrics;
mod scene;

pub use loop_runner::{
    run_app, run_app_with_metrics, AppError, LoopConfig, LoopSummary, StopReason,
    SLOW_TICK_ENV_VAR,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use scene::{Scene, SceneCommand};
