//! Error types for the world layer.

/// Errors that can occur in grid and profit computations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An arithmetic operation overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// A coordinate lies outside the map grid.
    #[error("coordinate ({x},{y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        /// The requested column.
        x: u32,
        /// The requested row.
        y: u32,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },

    /// Map dimensions fall outside the allowed `1..=100` range.
    #[error("invalid map dimensions {width}x{height} (each side must be 1..=100)")]
    InvalidDimensions {
        /// The requested width.
        width: u32,
        /// The requested height.
        height: u32,
    },

    /// A tile carries a building but no owner, or similar inconsistency.
    #[error("inconsistent tile state at ({x},{y}): {detail}")]
    InconsistentTile {
        /// The column of the bad tile.
        x: u32,
        /// The row of the bad tile.
        y: u32,
        /// What was inconsistent.
        detail: String,
    },
}
