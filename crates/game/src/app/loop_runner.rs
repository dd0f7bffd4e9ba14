use std::process::ExitCode;

use engine::{run_app, StopReason};
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_app(app.config, app.scene) {
        Ok(summary) => {
            let reason = match summary.stop_reason {
                StopReason::SceneQuit => "scene_quit",
                StopReason::TickLimit => "tick_limit",
            };
            info!(ticks = summary.ticks, reason, "run_finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}
