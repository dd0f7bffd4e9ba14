use crate::sim::{SimError, Simulation, TickSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Game-side driver of a simulation. The loop runner calls `update` right
/// before every simulation tick and `after_tick` right after it.
pub trait Scene {
    fn load(&mut self, sim: &mut Simulation) -> Result<(), SimError>;
    fn update(&mut self, fixed_dt_seconds: f32, sim: &mut Simulation) -> SceneCommand;
    fn after_tick(&mut self, _summary: &TickSummary, _sim: &mut Simulation) -> SceneCommand {
        SceneCommand::None
    }
    fn unload(&mut self, _sim: &mut Simulation) {}
    fn debug_title(&self, _sim: &Simulation) -> Option<String> {
        None
    }
}
