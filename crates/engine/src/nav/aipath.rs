use std::collections::{HashMap, VecDeque};
use std::fmt;

use tracing::debug;

use crate::math::Vec2;
use crate::world::{Entity, EntityId};

use super::grid::{TileCoord, TileGrid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpossibleReason {
    NoCollider,
    OutOfBounds,
    DestinationSolid,
    Unreachable,
}

impl ImpossibleReason {
    fn as_token(self) -> &'static str {
        match self {
            Self::NoCollider => "no_collider",
            Self::OutOfBounds => "out_of_bounds",
            Self::DestinationSolid => "destination_solid",
            Self::Unreachable => "unreachable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Ready { waypoints: usize },
    Impossible(ImpossibleReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathSubscriptionId(u64);

#[derive(Debug, Clone, PartialEq)]
struct SearchNode {
    distance: u32,
    neighbours: Vec<TileCoord>,
}

type ReadyHandler = Box<dyn FnMut(&PathStatus)>;

/// Tile route from an entity to a destination, stored as world-space
/// waypoints. The front point is the next one to reach.
pub struct AiPath {
    entity: EntityId,
    destination: Vec2,
    points: VecDeque<Vec2>,
    status: PathStatus,
    expanded_tiles: usize,
    next_subscription: u64,
    ready_observers: Vec<(PathSubscriptionId, ReadyHandler)>,
}

impl AiPath {
    pub fn new<G: TileGrid + ?Sized>(grid: &G, entity: &Entity, destination: Vec2) -> Self {
        let mut path = Self {
            entity: entity.id,
            destination,
            points: VecDeque::new(),
            status: PathStatus::Impossible(ImpossibleReason::Unreachable),
            expanded_tiles: 0,
            next_subscription: 0,
            ready_observers: Vec::new(),
        };
        path.compute(grid, entity);
        path
    }

    pub fn recalculate<G: TileGrid + ?Sized>(
        &mut self,
        grid: &G,
        entity: &Entity,
        new_destination: Vec2,
    ) -> PathStatus {
        self.entity = entity.id;
        self.destination = new_destination;
        self.compute(grid, entity);
        let status = self.status;
        for (_, handler) in &mut self.ready_observers {
            handler(&status);
        }
        status
    }

    pub fn subscribe_ready(
        &mut self,
        handler: impl FnMut(&PathStatus) + 'static,
    ) -> PathSubscriptionId {
        let id = PathSubscriptionId(self.next_subscription);
        self.next_subscription = self.next_subscription.saturating_add(1);
        self.ready_observers.push((id, Box::new(handler)));
        id
    }

    pub fn unsubscribe_ready(&mut self, id: PathSubscriptionId) -> bool {
        let before = self.ready_observers.len();
        self.ready_observers.retain(|(entry_id, _)| *entry_id != id);
        before != self.ready_observers.len()
    }

    pub fn next(&mut self) -> Option<Vec2> {
        if self.points.len() > 1 {
            self.points.pop_front();
        }
        self.points.front().copied()
    }

    pub fn second_next(&self) -> Option<Vec2> {
        if self.points.len() < 3 {
            return None;
        }
        self.points.get(2).copied()
    }

    pub fn is_done(&self) -> bool {
        self.points.len() <= 1
    }

    pub fn is_impossible(&self) -> bool {
        matches!(self.status, PathStatus::Impossible(_))
    }

    pub fn status(&self) -> PathStatus {
        self.status
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn destination(&self) -> Vec2 {
        self.destination
    }

    pub fn points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.points.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn expanded_tiles(&self) -> usize {
        self.expanded_tiles
    }

    fn compute<G: TileGrid + ?Sized>(&mut self, grid: &G, entity: &Entity) {
        self.points.clear();
        self.expanded_tiles = 0;
        match plan_route(grid, entity, self.destination) {
            Ok(route) => {
                self.expanded_tiles = route.expanded_tiles;
                self.points = route.waypoints;
                self.status = PathStatus::Ready {
                    waypoints: self.points.len(),
                };
                debug!(
                    entity = entity.id.0,
                    waypoints = self.points.len(),
                    expanded_tiles = self.expanded_tiles,
                    "path_computed"
                );
            }
            Err(rejection) => {
                self.expanded_tiles = rejection.expanded_tiles;
                self.status = PathStatus::Impossible(rejection.reason);
                debug!(
                    entity = entity.id.0,
                    reason = rejection.reason.as_token(),
                    expanded_tiles = self.expanded_tiles,
                    "path_impossible"
                );
            }
        }
    }
}

impl fmt::Debug for AiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiPath")
            .field("entity", &self.entity)
            .field("destination", &self.destination)
            .field("points", &self.points)
            .field("status", &self.status)
            .field("expanded_tiles", &self.expanded_tiles)
            .field("ready_observers", &self.ready_observers.len())
            .finish()
    }
}

struct Route {
    waypoints: VecDeque<Vec2>,
    expanded_tiles: usize,
}

struct Rejection {
    reason: ImpossibleReason,
    expanded_tiles: usize,
}

impl From<ImpossibleReason> for Rejection {
    fn from(reason: ImpossibleReason) -> Self {
        Self {
            reason,
            expanded_tiles: 0,
        }
    }
}

fn plan_route<G: TileGrid + ?Sized>(
    grid: &G,
    entity: &Entity,
    destination: Vec2,
) -> Result<Route, Rejection> {
    if entity.collider.is_none() {
        return Err(ImpossibleReason::NoCollider.into());
    }
    if grid.solid_at(destination) {
        return Err(ImpossibleReason::DestinationSolid.into());
    }

    let start = grid.pixel_to_tile(entity.position);
    let goal = grid.pixel_to_tile(destination);
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return Err(ImpossibleReason::OutOfBounds.into());
    }

    let (nodes, expanded_tiles) = expand(grid, start, goal)?;
    let waypoints = backtrace(grid, &nodes, start, goal, destination);
    Ok(Route {
        waypoints,
        expanded_tiles,
    })
}

// Not A*: the whole frontier is stably re-sorted by goal distance before
// every expansion.
fn expand<G: TileGrid + ?Sized>(
    grid: &G,
    start: TileCoord,
    goal: TileCoord,
) -> Result<(HashMap<TileCoord, SearchNode>, usize), Rejection> {
    let mut nodes = HashMap::new();
    nodes.insert(
        start,
        SearchNode {
            distance: 0,
            neighbours: Vec::new(),
        },
    );
    let mut frontier = vec![start];
    let mut expanded_tiles = 0usize;

    loop {
        frontier.sort_by_key(|tile| tile.manhattan_distance(goal));
        let Some(&current) = frontier.first() else {
            break;
        };
        expanded_tiles += 1;
        let current_distance = nodes.get(&current).map_or(0, |node| node.distance);

        for neighbour in current.orthogonal_neighbors() {
            if !grid.in_bounds(neighbour) || nodes.contains_key(&neighbour) {
                continue;
            }
            if grid.solid_at(grid.tile_center(neighbour)) {
                continue;
            }
            nodes.insert(
                neighbour,
                SearchNode {
                    distance: current_distance + 1,
                    neighbours: vec![current],
                },
            );
            if let Some(node) = nodes.get_mut(&current) {
                node.neighbours.push(neighbour);
            }
            frontier.push(neighbour);
        }

        if current == goal {
            return Ok((nodes, expanded_tiles));
        }
        frontier.remove(0);
    }

    Err(Rejection {
        reason: ImpossibleReason::Unreachable,
        expanded_tiles,
    })
}

// Goal tile diagonal to the tile two steps back drops the exact destination.
fn backtrace<G: TileGrid + ?Sized>(
    grid: &G,
    nodes: &HashMap<TileCoord, SearchNode>,
    start: TileCoord,
    goal: TileCoord,
    destination: Vec2,
) -> VecDeque<Vec2> {
    let mut reversed = vec![destination];
    let mut keeps_destination = true;
    let mut previous: Option<TileCoord> = None;
    let mut current = goal;

    while current != start {
        let Some(next) = closer_neighbour(nodes, current) else {
            break;
        };
        if keeps_destination && previous == Some(goal) && goal.is_diagonal_to(next) {
            reversed.remove(0);
            keeps_destination = false;
        }
        reversed.push(grid.tile_center(next));
        previous = Some(current);
        current = next;
    }

    reversed.into_iter().rev().collect()
}

fn closer_neighbour(nodes: &HashMap<TileCoord, SearchNode>, tile: TileCoord) -> Option<TileCoord> {
    let node = nodes.get(&tile)?;
    node.neighbours.iter().copied().find(|neighbour| {
        nodes
            .get(neighbour)
            .is_some_and(|candidate| candidate.distance < node.distance)
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::nav::grid::{GridSize, LayerGrid, TileMask, TileSize};
    use crate::physics::{ColliderDesc, ColliderId, ColliderLayer};

    fn walker_at(position: Vec2) -> Entity {
        Entity {
            id: EntityId(1),
            position,
            collider: Some(ColliderId(0)),
            pursuit_target: false,
            hostile: true,
            move_speed: 40.0,
            move_intent: Vec2::ZERO,
            move_destination: None,
            debug_name: "slime",
        }
    }

    fn mask(rows: &[&str]) -> TileMask {
        TileMask::from_rows(TileSize::default(), rows).expect("mask")
    }

    fn tile_of(grid: &TileMask, point: Vec2) -> TileCoord {
        grid.pixel_to_tile(point)
    }

    #[test]
    fn corridor_path_is_done_after_four_next_calls() {
        let grid = mask(&["....."]);
        let walker = walker_at(grid.tile_center(TileCoord::new(0, 0)));
        let destination = Vec2::new(70.0, 5.0);
        let mut path = AiPath::new(&grid, &walker, destination);

        assert!(!path.is_impossible());
        assert_eq!(path.len(), 5);
        for _ in 0..3 {
            path.next();
            assert!(!path.is_done());
        }
        assert_eq!(path.next(), Some(destination));
        assert!(path.is_done());
    }

    #[test]
    fn next_stabilizes_on_final_point() {
        let grid = mask(&["...."]);
        let walker = walker_at(grid.tile_center(TileCoord::new(0, 0)));
        let destination = Vec2::new(60.0, 8.0);
        let mut path = AiPath::new(&grid, &walker, destination);

        for _ in 0..10 {
            path.next();
        }
        assert_eq!(path.next(), Some(destination));
        assert_eq!(path.next(), Some(destination));
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn blocked_destination_is_impossible_without_expansion() {
        let mut layer = ColliderLayer::new();
        layer.add(ColliderDesc::rect(Vec2::new(40.0, 8.0), 16.0, 16.0));
        let grid = LayerGrid::new(&layer, TileSize::default(), GridSize { width: 5, height: 1 })
            .expect("grid");
        let walker = walker_at(Vec2::new(8.0, 8.0));

        let path = AiPath::new(&grid, &walker, Vec2::new(41.0, 9.0));

        assert!(path.is_impossible());
        assert_eq!(path.len(), 0);
        assert_eq!(path.expanded_tiles(), 0);
        assert_eq!(
            path.status(),
            PathStatus::Impossible(ImpossibleReason::DestinationSolid)
        );
    }

    #[test]
    fn enclosed_destination_is_unreachable() {
        let grid = mask(&[
            ".....", //
            "..###", //
            "..#.#", //
            "..###", //
        ]);
        let walker = walker_at(grid.tile_center(TileCoord::new(0, 0)));
        let path = AiPath::new(&grid, &walker, grid.tile_center(TileCoord::new(3, 2)));

        assert!(path.is_impossible());
        assert!(path.is_done());
        assert_eq!(
            path.status(),
            PathStatus::Impossible(ImpossibleReason::Unreachable)
        );
        assert!(path.expanded_tiles() > 0);
    }

    #[test]
    fn entity_without_collider_gets_no_path() {
        let grid = mask(&["..."]);
        let mut walker = walker_at(grid.tile_center(TileCoord::new(0, 0)));
        walker.collider = None;
        let path = AiPath::new(&grid, &walker, grid.tile_center(TileCoord::new(2, 0)));
        assert_eq!(
            path.status(),
            PathStatus::Impossible(ImpossibleReason::NoCollider)
        );
    }

    #[test]
    fn destination_outside_grid_is_impossible() {
        let grid = mask(&["..."]);
        let walker = walker_at(grid.tile_center(TileCoord::new(0, 0)));
        let path = AiPath::new(&grid, &walker, Vec2::new(8.0, -40.0));
        // Pixels outside a mask read as solid, which is rejected first.
        assert!(path.is_impossible());
    }

    #[test]
    fn route_around_wall_only_visits_walkable_tiles() {
        let grid = mask(&[
            "...#...", //
            "...#...", //
            "...#...", //
            "...#...", //
            ".......", //
        ]);
        let walker = walker_at(grid.tile_center(TileCoord::new(1, 2)));
        let destination = grid.tile_center(TileCoord::new(5, 2));
        let path = AiPath::new(&grid, &walker, destination);

        assert!(!path.is_impossible());
        let tiles = path
            .points()
            .map(|point| tile_of(&grid, point))
            .collect::<Vec<_>>();
        let goal = TileCoord::new(5, 2);
        assert_eq!(tiles.first(), Some(&TileCoord::new(1, 2)));
        let last = tiles.last().copied().expect("last waypoint");
        assert!(last.manhattan_distance(goal) <= 1, "{last:?}");
        assert!(tiles.iter().all(|tile| !grid.is_solid_tile(*tile)));
        assert!(tiles.contains(&TileCoord::new(3, 4)));
        for pair in tiles.windows(2) {
            assert_eq!(pair[0].manhattan_distance(pair[1]), 1, "{pair:?}");
        }
    }

    #[test]
    fn diagonal_destination_is_merged_into_approach_tile() {
        let grid = mask(&["...", "...", "..."]);
        let walker = walker_at(grid.tile_center(TileCoord::new(0, 1)));
        let destination = grid.tile_center(TileCoord::new(1, 0));
        let path = AiPath::new(&grid, &walker, destination);

        let points = path.points().collect::<Vec<_>>();
        assert_eq!(
            points,
            vec![
                grid.tile_center(TileCoord::new(0, 1)),
                grid.tile_center(TileCoord::new(0, 0)),
            ]
        );
        assert!(!points.contains(&destination));
    }

    #[test]
    fn same_tile_destination_yields_single_exact_point() {
        let grid = mask(&["..."]);
        let walker = walker_at(Vec2::new(20.0, 8.0));
        let destination = Vec2::new(30.0, 2.0);
        let mut path = AiPath::new(&grid, &walker, destination);

        assert!(!path.is_impossible());
        assert!(path.is_done());
        assert_eq!(path.next(), Some(destination));
    }

    #[test]
    fn second_next_needs_three_points() {
        let grid = mask(&["...."]);
        let walker = walker_at(grid.tile_center(TileCoord::new(0, 0)));
        let mut path = AiPath::new(&grid, &walker, grid.tile_center(TileCoord::new(3, 0)));

        assert_eq!(path.second_next(), Some(grid.tile_center(TileCoord::new(2, 0))));
        path.next();
        assert_eq!(path.second_next(), Some(grid.tile_center(TileCoord::new(3, 0))));
        path.next();
        assert_eq!(path.second_next(), None);
    }

    #[test]
    fn recalculate_replaces_route_and_signals_before_returning() {
        let grid = mask(&["....."]);
        let walker = walker_at(grid.tile_center(TileCoord::new(0, 0)));
        let mut path = AiPath::new(&grid, &walker, grid.tile_center(TileCoord::new(4, 0)));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        path.subscribe_ready(move |status| sink.borrow_mut().push(*status));

        let status = path.recalculate(&grid, &walker, grid.tile_center(TileCoord::new(1, 0)));

        assert_eq!(status, PathStatus::Ready { waypoints: 2 });
        assert_eq!(*seen.borrow(), vec![status]);
        assert_eq!(path.destination(), grid.tile_center(TileCoord::new(1, 0)));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn unsubscribed_ready_handler_is_not_called() {
        let grid = mask(&["..."]);
        let walker = walker_at(grid.tile_center(TileCoord::new(0, 0)));
        let mut path = AiPath::new(&grid, &walker, grid.tile_center(TileCoord::new(2, 0)));
        let calls = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&calls);
        let id = path.subscribe_ready(move |_| *sink.borrow_mut() += 1);

        assert!(path.unsubscribe_ready(id));
        path.recalculate(&grid, &walker, grid.tile_center(TileCoord::new(1, 0)));
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn repeated_searches_are_deterministic() {
        let grid = mask(&[".....", ".....", "..#..", ".....", "....."]);
        let walker = walker_at(grid.tile_center(TileCoord::new(0, 2)));
        let destination = grid.tile_center(TileCoord::new(4, 2));
        let first = AiPath::new(&grid, &walker, destination)
            .points()
            .collect::<Vec<_>>();
        let second = AiPath::new(&grid, &walker, destination)
            .points()
            .collect::<Vec<_>>();
        assert_eq!(first, second);
    }
}
