pub mod app;
pub mod debug_draw;
mod math;
pub mod movement;
pub mod nav;
pub mod physics;
pub mod pursuit;
mod sim;
mod world;

pub use app::{
    run_app, run_app_with_metrics, AppError, LoopConfig, LoopMetricsSnapshot, LoopSummary,
    MetricsHandle, Scene, SceneCommand, StopReason, SLOW_TICK_ENV_VAR,
};
pub use debug_draw::{draw_layer, draw_path, DebugFrame};
pub use math::Vec2;
pub use movement::{resolve_step, step_toward};
pub use nav::{
    AiPath, GridError, GridSize, ImpossibleReason, LayerGrid, PathStatus, TileCoord, TileGrid,
    TileMask, TileSize,
};
pub use physics::{
    Collider, ColliderDesc, ColliderId, ColliderLayer, ColliderObservers, CollisionContact,
    CollisionPhase, PointerEvent, PointerPhase, QueryScope, Shape, SubscriptionId, SweepReport,
};
pub use pursuit::{PursuitAgent, PursuitConfig, PursuitEvent, PursuitEventBus, PursuitEventCounts};
pub use sim::{SimError, Simulation, TickSummary, DEFAULT_ARRIVAL_THRESHOLD};
pub use world::{Entity, EntityId, EntitySpawn, EntityWorld};
