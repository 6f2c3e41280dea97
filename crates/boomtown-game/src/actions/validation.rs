//! Shared precondition checks for action-layer operations.
//!
//! Every operation validates through these helpers before mutating
//! anything. Each failure is a single-line [`GameError`] naming the
//! violated rule; operations never partially apply.

use boomtown_types::{BuildingInstance, GameCompany, GameError, GameMap, Money, Tile};
use boomtown_world::catalog;

/// The actor must not be imprisoned.
pub fn ensure_not_imprisoned(company: &GameCompany) -> Result<(), GameError> {
    if company.in_prison {
        return Err(GameError::precondition("in prison"));
    }
    Ok(())
}

/// The actor must currently be on the given map.
pub fn ensure_on_map(company: &GameCompany, map: &GameMap) -> Result<(), GameError> {
    if company.map_id != Some(map.id) {
        return Err(GameError::precondition("not on this map"));
    }
    if !map.active {
        return Err(GameError::precondition("map is closed"));
    }
    Ok(())
}

/// The actor must be able to cover `cost` from liquid cash.
pub fn ensure_funds(company: &GameCompany, cost: Money) -> Result<(), GameError> {
    if !company.cash.covers(cost) {
        return Err(GameError::precondition("insufficient cash"));
    }
    Ok(())
}

/// The actor must own the tile.
pub fn ensure_owns_tile(company: &GameCompany, tile: &Tile) -> Result<(), GameError> {
    if tile.owner != Some(company.id) {
        return Err(GameError::precondition("tile is not yours"));
    }
    Ok(())
}

/// The actor must own the building.
pub fn ensure_owns_building(
    company: &GameCompany,
    building: &BuildingInstance,
) -> Result<(), GameError> {
    if building.owner != company.id {
        return Err(GameError::precondition("building is not yours"));
    }
    Ok(())
}

/// The tile must carry no live building (visual markers do not count and
/// are replaced by construction).
pub fn ensure_tile_clear(existing: Option<&BuildingInstance>) -> Result<(), GameError> {
    match existing {
        None => Ok(()),
        Some(b) if catalog::is_marker(b.kind) => Ok(()),
        Some(_) => Err(GameError::precondition("tile already has a building")),
    }
}

/// The tile and building must belong to the map under action.
pub fn ensure_tile_on_map(tile: &Tile, map: &GameMap) -> Result<(), GameError> {
    if tile.map_id != map.id {
        return Err(GameError::not_found("tile is not on this map"));
    }
    Ok(())
}
