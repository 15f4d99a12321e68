//! Fixed engineering constants
//!
//! These values define the manufacturing output bit for bit. Changing any of
//! them changes the fragments of every existing board.

use super::units::Length;

/// Maximum deviation between a true arc and its flattened polyline
pub const MAX_ARC_TOLERANCE: Length = Length::from_nm(5_000);

/// Fragments and holes below this area (nm², i.e. 1 µm²) are dropped
pub const MIN_FRAGMENT_AREA: f64 = 1.0e6;

/// Largest absolute coordinate accepted by the clipping facade (1 km)
pub const MAX_COORDINATE: i64 = 1_000_000_000_000;
