use std::env;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::sim::{SimError, Simulation};

use super::metrics::MetricsAccumulator;
use super::{MetricsHandle, Scene, SceneCommand};

pub const SLOW_TICK_ENV_VAR: &str = "FARMCORE_SLOW_TICK_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stop after this many simulation ticks. `None` runs until the scene quits.
    pub max_ticks: Option<u64>,
    /// Pace ticks against the wall clock. When off, ticks run back to back.
    pub realtime: bool,
    pub simulated_slow_tick_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 30,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_ticks: None,
            realtime: true,
            simulated_slow_tick_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("scene failed to load: {0}")]
    SceneLoad(#[source] SimError),
    #[error("simulation tick {tick} failed: {source}")]
    Tick {
        tick: u64,
        #[source]
        source: SimError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SceneQuit,
    TickLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub stop_reason: StopReason,
    pub entity_count: usize,
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<LoopSummary, AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, scene, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<LoopSummary, AppError> {
    let mut sim = Simulation::new();
    scene.load(&mut sim).map_err(AppError::SceneLoad)?;
    sim.apply_pending();
    info!(entity_count = sim.world().entity_count(), "scene_loaded");

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_tick_delay = resolve_slow_tick_delay(config.simulated_slow_tick_ms);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_tick_delay_ms = slow_tick_delay.as_millis() as u64,
        max_ticks = ?config.max_ticks,
        realtime = config.realtime,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_title: Option<String> = None;
    let mut ticks_run = 0u64;

    let stop_reason = 'frames: loop {
        let frame_dt = if config.realtime {
            let now = Instant::now();
            let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            raw_frame_dt
        } else {
            fixed_dt
        };

        accumulator = accumulator.saturating_add(clamp_frame_delta(frame_dt, max_frame_delta));
        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            if config.max_ticks.is_some_and(|limit| ticks_run >= limit) {
                break 'frames StopReason::TickLimit;
            }
            if slow_tick_delay > Duration::ZERO {
                // Explicit debug perturbation only.
                thread::sleep(slow_tick_delay);
            }

            let tick_start = Instant::now();
            let command = scene.update(fixed_dt_seconds, &mut sim);
            let summary = sim.tick(fixed_dt_seconds).map_err(|source| AppError::Tick {
                tick: ticks_run,
                source,
            })?;
            let after = scene.after_tick(&summary, &mut sim);
            metrics_accumulator.record_tick(tick_start.elapsed());
            ticks_run = summary.tick;

            if command == SceneCommand::Quit || after == SceneCommand::Quit {
                info!(reason = "scene_quit", tick = ticks_run, "shutdown_requested");
                break 'frames StopReason::SceneQuit;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        let next_title = scene.debug_title(&sim);
        if next_title != last_title {
            if let Some(title) = &next_title {
                info!(title = title.as_str(), "scene_title");
            }
            last_title = next_title;
        }

        let now = Instant::now();
        if let Some(snapshot) =
            metrics_accumulator.maybe_snapshot(now, sim.world().entity_count())
        {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                tick_time_ms = snapshot.tick_time_ms,
                entity_count = snapshot.entity_count,
                "loop_metrics"
            );
        }

        if config.realtime {
            let idle = fixed_dt.saturating_sub(accumulator);
            if !idle.is_zero() {
                thread::sleep(idle);
            }
        }
    };

    scene.unload(&mut sim);
    let summary = LoopSummary {
        ticks: ticks_run,
        stop_reason,
        entity_count: sim.world().entity_count(),
    };
    info!(
        ticks = summary.ticks,
        reason = ?summary.stop_reason,
        entity_count = summary.entity_count,
        "shutdown"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn resolve_slow_tick_delay(config_slow_tick_ms: u64) -> Duration {
    match env::var(SLOW_TICK_ENV_VAR) {
        Ok(value) => parse_slow_tick_ms(&value)
            .map(Duration::from_millis)
            .unwrap_or_else(|| {
                warn!(
                    env_var = SLOW_TICK_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-tick env var value; falling back to config"
                );
                Duration::from_millis(config_slow_tick_ms)
            }),
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_tick_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_TICK_ENV_VAR,
                error = %err,
                "unable to read slow-tick env var; falling back to config"
            );
            Duration::from_millis(config_slow_tick_ms)
        }
    }
}

fn parse_slow_tick_ms(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
