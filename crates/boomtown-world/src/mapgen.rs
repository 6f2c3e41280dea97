//! Map generation: terrain layout and special-building placement.
//!
//! [`generate_tiles`] produces the full `width x height` tile set for a
//! new map from a seed. Generation is deterministic per seed so a map can
//! be regenerated for inspection. Terrain rules:
//!
//! - A road runs every seventh column and row (maps too small get none).
//! - A river column of water near one third of the width.
//! - Trees and dirt tracks are scattered pseudo-randomly.
//! - One of each special building lands on a free-land tile, spread
//!   across the grid; tiny maps place as many as fit (at most one each).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use boomtown_types::{MapId, SpecialBuilding, Terrain, Tile, TileId};

use crate::error::WorldError;

/// Spacing between generated roads, in tiles.
const ROAD_SPACING: u32 = 7;

/// Per-tile chance of trees, in percent.
const TREES_PCT: u32 = 10;

/// Per-tile chance of a dirt track, in percent.
const DIRT_TRACK_PCT: u32 = 5;

/// Generate the full tile set for a new `width` x `height` map.
///
/// # Errors
///
/// Returns [`WorldError::InvalidDimensions`] unless both sides are in
/// `1..=100`.
pub fn generate_tiles(
    map_id: MapId,
    width: u32,
    height: u32,
    seed: u64,
) -> Result<Vec<Tile>, WorldError> {
    if !(1..=100).contains(&width) || !(1..=100).contains(&height) {
        return Err(WorldError::InvalidDimensions { width, height });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let river_x = if width >= 6 { Some(width / 3) } else { None };

    let mut tiles = Vec::with_capacity((width as usize).saturating_mul(height as usize));
    for y in 0..height {
        for x in 0..width {
            let terrain = pick_terrain(x, y, width, height, river_x, &mut rng);
            tiles.push(Tile {
                id: TileId::new(),
                map_id,
                x,
                y,
                terrain,
                special: None,
                owner: None,
            });
        }
    }

    place_specials(&mut tiles, &mut rng);
    Ok(tiles)
}

/// Choose the terrain for one cell.
fn pick_terrain(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    river_x: Option<u32>,
    rng: &mut StdRng,
) -> Terrain {
    if river_x == Some(x) {
        return Terrain::Water;
    }
    let on_road_col = width > ROAD_SPACING && x % ROAD_SPACING == ROAD_SPACING / 2;
    let on_road_row = height > ROAD_SPACING && y % ROAD_SPACING == ROAD_SPACING / 2;
    if on_road_col || on_road_row {
        return Terrain::Road;
    }
    let roll = rng.random_range(0..100u32);
    if roll < TREES_PCT {
        Terrain::Trees
    } else if roll < TREES_PCT.saturating_add(DIRT_TRACK_PCT) {
        Terrain::DirtTrack
    } else {
        Terrain::FreeLand
    }
}

/// Place at most one of each special building on distinct free-land tiles.
///
/// Candidates are visited in a shuffled order; a map with fewer than four
/// free-land tiles simply gets fewer fixtures.
fn place_specials(tiles: &mut [Tile], rng: &mut StdRng) {
    let mut candidates: Vec<usize> = tiles
        .iter()
        .enumerate()
        .filter(|(_, t)| t.terrain == Terrain::FreeLand)
        .map(|(i, _)| i)
        .collect();

    // Fisher-Yates shuffle driven by the map seed.
    for i in (1..candidates.len()).rev() {
        let j = rng.random_range(0..=i);
        candidates.swap(i, j);
    }

    let fixtures = [
        SpecialBuilding::Temple,
        SpecialBuilding::Bank,
        SpecialBuilding::PoliceStation,
        SpecialBuilding::Casino,
    ];
    for (slot, fixture) in candidates.iter().zip(fixtures.iter()) {
        if let Some(tile) = tiles.get_mut(*slot) {
            tile.special = Some(*fixture);
        }
    }
}
