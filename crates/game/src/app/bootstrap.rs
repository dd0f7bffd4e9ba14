use std::process::ExitCode;

use engine::{LoopConfig, Scene};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use super::config::{resolve_config, CONFIG_ENV_VAR};
use super::farm::FarmScene;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, ExitCode> {
    init_tracing();
    info!("=== Farmcore Startup ===");

    let game_config = match resolve_config() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, env_var = CONFIG_ENV_VAR, "startup_failed");
            return Err(ExitCode::FAILURE);
        }
    };
    let config = game_config.loop_config();
    info!(
        target_tps = config.target_tps,
        max_ticks = ?config.max_ticks,
        realtime = config.realtime,
        "config_resolved"
    );

    Ok(AppWiring {
        config,
        scene: Box::new(FarmScene::new(game_config)),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
