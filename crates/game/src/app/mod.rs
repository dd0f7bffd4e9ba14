pub(crate) mod bootstrap;
pub(crate) mod config;
mod farm;
pub(crate) mod loop_runner;
