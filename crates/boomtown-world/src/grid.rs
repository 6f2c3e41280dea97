//! Read-only grid snapshots consumed by the profit engine and the dirty
//! tracker.
//!
//! The engine never reads the database; callers assemble a [`TileGrid`]
//! from the map's tiles and non-collapsed buildings and pass it in. For
//! maps capped at 100x100 = 10,000 tiles a full snapshot per evaluation
//! is acceptable.

use std::collections::BTreeMap;

use boomtown_types::{
    BuildingInstance, BuildingKind, GameCompanyId, SpecialBuilding, Terrain, Tile,
};

use crate::error::WorldError;

/// The eight neighbor offsets, in a fixed scan order so every evaluation
/// visits neighbors identically (determinism requirement).
pub const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// The building content of one snapshot cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingView {
    /// Catalog key.
    pub kind: BuildingKind,
    /// The owning company.
    pub owner: GameCompanyId,
    /// Whether the building has collapsed (ignored by adjacency).
    pub collapsed: bool,
}

/// One cell of a grid snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileView {
    /// The tile's terrain.
    pub terrain: Terrain,
    /// A map fixture occupying the tile, if any.
    pub special: Option<SpecialBuilding>,
    /// The current owner, if any.
    pub owner: Option<GameCompanyId>,
    /// The building standing on the tile, if any.
    pub building: Option<BuildingView>,
}

/// A read-only snapshot of one map's tiles and buildings.
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: u32,
    height: u32,
    cells: BTreeMap<(u32, u32), TileView>,
}

impl TileGrid {
    /// Assemble a snapshot from entity slices.
    ///
    /// Collapsed buildings are kept in the snapshot (they still block the
    /// tile) but flagged so the profit engine skips them.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] for out-of-range sides and
    /// [`WorldError::OutOfBounds`] if a tile lies outside the grid.
    pub fn from_entities(
        width: u32,
        height: u32,
        tiles: &[Tile],
        buildings: &[BuildingInstance],
    ) -> Result<Self, WorldError> {
        if !(1..=100).contains(&width) || !(1..=100).contains(&height) {
            return Err(WorldError::InvalidDimensions { width, height });
        }

        let mut by_tile = BTreeMap::new();
        for b in buildings {
            by_tile.insert(b.tile_id, b);
        }

        let mut cells = BTreeMap::new();
        for tile in tiles {
            if tile.x >= width || tile.y >= height {
                return Err(WorldError::OutOfBounds {
                    x: tile.x,
                    y: tile.y,
                    width,
                    height,
                });
            }
            let building = by_tile.get(&tile.id).map(|b| BuildingView {
                kind: b.kind,
                owner: b.owner,
                collapsed: b.collapsed,
            });
            cells.insert(
                (tile.x, tile.y),
                TileView {
                    terrain: tile.terrain,
                    special: tile.special,
                    owner: tile.owner,
                    building,
                },
            );
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Grid width in tiles.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The snapshot cell at `(x, y)`, or `None` off-map.
    pub fn cell(&self, x: u32, y: u32) -> Option<&TileView> {
        self.cells.get(&(x, y))
    }

    /// The valid neighbor cells of `(x, y)` with their coordinates, in the
    /// fixed scan order. Off-map neighbors are simply absent.
    pub fn neighbors(&self, x: u32, y: u32) -> Vec<((u32, u32), &TileView)> {
        neighborhood(x, y, self.width, self.height)
            .into_iter()
            .filter_map(|(nx, ny)| self.cells.get(&(nx, ny)).map(|view| ((nx, ny), view)))
            .collect()
    }
}

/// The valid neighbor coordinates of `(x, y)` on a `width` x `height`
/// grid, in the fixed scan order.
///
/// This is also the dirty tracker's notion of "neighborhood": after any
/// tile-content mutation, buildings on these coordinates (plus the changed
/// tile itself) need a profit recalculation.
pub fn neighborhood(x: u32, y: u32, width: u32, height: u32) -> Vec<(u32, u32)> {
    let mut out = Vec::with_capacity(8);
    for (dx, dy) in NEIGHBOR_OFFSETS {
        let nx = i64::from(x).saturating_add(dx);
        let ny = i64::from(y).saturating_add(dy);
        if nx < 0 || ny < 0 || nx >= i64::from(width) || ny >= i64::from(height) {
            continue;
        }
        let (Ok(nx), Ok(ny)) = (u32::try_from(nx), u32::try_from(ny)) else {
            continue;
        };
        out.push((nx, ny));
    }
    out
}

/// The dirty set for a change at `(x, y)`: the changed tile plus its valid
/// neighbors.
pub fn dirty_set(x: u32, y: u32, width: u32, height: u32) -> Vec<(u32, u32)> {
    let mut out = vec![(x, y)];
    out.extend(neighborhood(x, y, width, height));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boomtown_types::{MapId, TileId};

    use super::*;

    fn make_tile(map_id: MapId, x: u32, y: u32, terrain: Terrain) -> Tile {
        Tile {
            id: TileId::new(),
            map_id,
            x,
            y,
            terrain,
            special: None,
            owner: None,
        }
    }

    #[test]
    fn corner_has_three_neighbors() {
        assert_eq!(neighborhood(0, 0, 5, 5).len(), 3);
        assert_eq!(neighborhood(4, 4, 5, 5).len(), 3);
    }

    #[test]
    fn edge_has_five_neighbors() {
        assert_eq!(neighborhood(2, 0, 5, 5).len(), 5);
        assert_eq!(neighborhood(0, 2, 5, 5).len(), 5);
    }

    #[test]
    fn interior_has_eight_neighbors() {
        assert_eq!(neighborhood(2, 2, 5, 5).len(), 8);
    }

    #[test]
    fn one_by_one_grid_has_no_neighbors() {
        assert!(neighborhood(0, 0, 1, 1).is_empty());
        assert_eq!(dirty_set(0, 0, 1, 1), vec![(0, 0)]);
    }

    #[test]
    fn dirty_set_includes_center() {
        let set = dirty_set(2, 2, 5, 5);
        assert_eq!(set.len(), 9);
        assert!(set.contains(&(2, 2)));
        assert!(set.contains(&(1, 1)));
        assert!(set.contains(&(3, 3)));
    }

    #[test]
    fn grid_rejects_bad_dimensions() {
        assert!(matches!(
            TileGrid::from_entities(0, 5, &[], &[]),
            Err(WorldError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            TileGrid::from_entities(5, 101, &[], &[]),
            Err(WorldError::InvalidDimensions { .. })
        ));
        assert!(TileGrid::from_entities(1, 1, &[], &[]).is_ok());
        assert!(TileGrid::from_entities(100, 100, &[], &[]).is_ok());
    }

    #[test]
    fn grid_rejects_out_of_bounds_tiles() {
        let map_id = MapId::new();
        let stray = make_tile(map_id, 7, 0, Terrain::FreeLand);
        assert!(matches!(
            TileGrid::from_entities(5, 5, &[stray], &[]),
            Err(WorldError::OutOfBounds { x: 7, .. })
        ));
    }

    #[test]
    fn neighbors_skip_missing_cells() {
        let map_id = MapId::new();
        let tiles = vec![
            make_tile(map_id, 0, 0, Terrain::FreeLand),
            make_tile(map_id, 1, 0, Terrain::Water),
        ];
        let grid = TileGrid::from_entities(3, 3, &tiles, &[]).unwrap();
        // Only (1,0) is present among (0,0)'s potential neighbors.
        let neighbors = grid.neighbors(0, 0);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors.first().map(|(c, _)| *c), Some((1, 0)));
    }
}
