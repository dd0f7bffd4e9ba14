mod aipath;
mod grid;

pub use aipath::{AiPath, ImpossibleReason, PathStatus, PathSubscriptionId};
pub use grid::{
    validate_grid, GridError, GridSize, LayerGrid, TileCoord, TileGrid, TileMask, TileSize,
};
