use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Vec2;
use crate::physics::ColliderLayer;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileSize {
    pub width: f32,
    pub height: f32,
}

impl Default for TileSize {
    fn default() -> Self {
        Self {
            width: 16.0,
            height: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan_distance(self, other: Self) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.y.abs_diff(other.y))
    }

    pub fn is_diagonal_to(self, other: Self) -> bool {
        self.x.abs_diff(other.x) == 1 && self.y.abs_diff(other.y) == 1
    }

    /// Up, down, left, right. No diagonals.
    pub fn orthogonal_neighbors(self) -> [Self; 4] {
        [
            Self::new(self.x, self.y - 1),
            Self::new(self.x, self.y + 1),
            Self::new(self.x - 1, self.y),
            Self::new(self.x + 1, self.y),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GridError {
    #[error("tile size must be finite and positive, got {width}x{height}")]
    InvalidTileSize { width: f32, height: f32 },
    #[error("grid must contain at least one tile, got {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },
    #[error("tile mask row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Walkability collaborator consumed by pathfinding.
///
/// Pixel to tile: `tile_x = floor(pixel_x / tile_width)`. Tile to pixel maps
/// to the tile's center, `(tile_x + 0.5) * tile_width`.
pub trait TileGrid {
    fn tile_size(&self) -> TileSize;
    fn grid_size(&self) -> GridSize;
    fn solid_at(&self, pixel: Vec2) -> bool;

    fn pixel_to_tile(&self, pixel: Vec2) -> TileCoord {
        let tile_size = self.tile_size();
        TileCoord {
            x: (pixel.x / tile_size.width).floor() as i32,
            y: (pixel.y / tile_size.height).floor() as i32,
        }
    }

    fn tile_center(&self, tile: TileCoord) -> Vec2 {
        let tile_size = self.tile_size();
        Vec2 {
            x: (tile.x as f32 + 0.5) * tile_size.width,
            y: (tile.y as f32 + 0.5) * tile_size.height,
        }
    }

    fn in_bounds(&self, tile: TileCoord) -> bool {
        let grid_size = self.grid_size();
        tile.x >= 0
            && tile.y >= 0
            && (tile.x as u32) < grid_size.width
            && (tile.y as u32) < grid_size.height
    }
}

pub fn validate_grid(tile_size: TileSize, grid_size: GridSize) -> Result<(), GridError> {
    let valid_dimension = |value: f32| value.is_finite() && value > 0.0;
    if !valid_dimension(tile_size.width) || !valid_dimension(tile_size.height) {
        return Err(GridError::InvalidTileSize {
            width: tile_size.width,
            height: tile_size.height,
        });
    }
    if grid_size.width == 0 || grid_size.height == 0 {
        return Err(GridError::EmptyGrid {
            width: grid_size.width,
            height: grid_size.height,
        });
    }
    Ok(())
}

/// Grid whose solid tiles are the static colliders of a layer.
#[derive(Debug, Clone, Copy)]
pub struct LayerGrid<'a> {
    layer: &'a ColliderLayer,
    tile_size: TileSize,
    grid_size: GridSize,
}

impl<'a> LayerGrid<'a> {
    pub fn new(
        layer: &'a ColliderLayer,
        tile_size: TileSize,
        grid_size: GridSize,
    ) -> Result<Self, GridError> {
        validate_grid(tile_size, grid_size)?;
        Ok(Self {
            layer,
            tile_size,
            grid_size,
        })
    }
}

impl TileGrid for LayerGrid<'_> {
    fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    fn grid_size(&self) -> GridSize {
        self.grid_size
    }

    fn solid_at(&self, pixel: Vec2) -> bool {
        self.layer.nondynamic_collision_at_position(pixel)
    }
}

/// Fixed walkability mask, one flag per tile. Pixels outside the grid are solid.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMask {
    tile_size: TileSize,
    grid_size: GridSize,
    solid: Vec<bool>,
}

impl TileMask {
    pub fn open(tile_size: TileSize, grid_size: GridSize) -> Result<Self, GridError> {
        validate_grid(tile_size, grid_size)?;
        Ok(Self {
            tile_size,
            grid_size,
            solid: vec![false; grid_size.width as usize * grid_size.height as usize],
        })
    }

    /// `#` marks a solid tile; any other character is walkable.
    pub fn from_rows(tile_size: TileSize, rows: &[&str]) -> Result<Self, GridError> {
        let width = rows.first().map(|row| row.chars().count()).unwrap_or(0);
        let grid_size = GridSize {
            width: width as u32,
            height: rows.len() as u32,
        };
        let mut mask = Self::open(tile_size, grid_size)?;
        for (y, row) in rows.iter().enumerate() {
            let actual = row.chars().count();
            if actual != width {
                return Err(GridError::RaggedRow {
                    row: y,
                    expected: width,
                    actual,
                });
            }
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    mask.set_solid(TileCoord::new(x as i32, y as i32), true);
                }
            }
        }
        Ok(mask)
    }

    pub fn set_solid(&mut self, tile: TileCoord, solid: bool) -> bool {
        match self.index_of(tile) {
            Some(index) => {
                self.solid[index] = solid;
                true
            }
            None => false,
        }
    }

    pub fn is_solid_tile(&self, tile: TileCoord) -> bool {
        self.index_of(tile)
            .and_then(|index| self.solid.get(index))
            .copied()
            .unwrap_or(true)
    }

    fn index_of(&self, tile: TileCoord) -> Option<usize> {
        if !self.in_bounds(tile) {
            return None;
        }
        Some(tile.y as usize * self.grid_size.width as usize + tile.x as usize)
    }
}

impl TileGrid for TileMask {
    fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    fn grid_size(&self) -> GridSize {
        self.grid_size
    }

    fn solid_at(&self, pixel: Vec2) -> bool {
        self.is_solid_tile(self.pixel_to_tile(pixel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ColliderDesc;

    #[test]
    fn pixel_to_tile_floors_and_center_round_trips() {
        let mask = TileMask::open(TileSize::default(), GridSize { width: 4, height: 4 })
            .expect("mask");
        assert_eq!(mask.pixel_to_tile(Vec2::new(31.9, 16.0)), TileCoord::new(1, 1));
        assert_eq!(mask.pixel_to_tile(Vec2::new(-0.5, 0.0)), TileCoord::new(-1, 0));
        assert_eq!(mask.tile_center(TileCoord::new(2, 0)), Vec2::new(40.0, 8.0));
    }

    #[test]
    fn bounds_reject_negative_and_overflowing_tiles() {
        let mask = TileMask::open(TileSize::default(), GridSize { width: 3, height: 2 })
            .expect("mask");
        assert!(mask.in_bounds(TileCoord::new(2, 1)));
        assert!(!mask.in_bounds(TileCoord::new(3, 1)));
        assert!(!mask.in_bounds(TileCoord::new(0, -1)));
    }

    #[test]
    fn layer_grid_reports_static_colliders_as_solid() {
        let mut layer = ColliderLayer::new();
        layer.add(ColliderDesc::rect(Vec2::new(24.0, 8.0), 16.0, 16.0));
        layer.add(ColliderDesc::circle(Vec2::new(8.0, 8.0), 6.0).dynamic());
        let grid = LayerGrid::new(&layer, TileSize::default(), GridSize { width: 3, height: 1 })
            .expect("grid");

        assert!(grid.solid_at(grid.tile_center(TileCoord::new(1, 0))));
        assert!(!grid.solid_at(grid.tile_center(TileCoord::new(0, 0))));
        assert!(!grid.solid_at(grid.tile_center(TileCoord::new(2, 0))));
    }

    #[test]
    fn invalid_dimensions_are_rejected() {
        let layer = ColliderLayer::new();
        let zero_tile = TileSize {
            width: 0.0,
            height: 16.0,
        };
        assert!(matches!(
            LayerGrid::new(&layer, zero_tile, GridSize { width: 1, height: 1 }),
            Err(GridError::InvalidTileSize { .. })
        ));
        assert!(matches!(
            LayerGrid::new(&layer, TileSize::default(), GridSize { width: 0, height: 4 }),
            Err(GridError::EmptyGrid { .. })
        ));
    }

    #[test]
    fn mask_rows_must_be_rectangular() {
        let result = TileMask::from_rows(TileSize::default(), &["..#", ".#"]);
        assert_eq!(
            result,
            Err(GridError::RaggedRow {
                row: 1,
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn diagonal_detection_requires_both_axes() {
        let origin = TileCoord::new(2, 2);
        assert!(origin.is_diagonal_to(TileCoord::new(3, 1)));
        assert!(!origin.is_diagonal_to(TileCoord::new(3, 2)));
        assert!(!origin.is_diagonal_to(TileCoord::new(4, 3)));
    }
}
