//! Board geometry primitives
//!
//! Submodules:
//! - `units`: fixed-point lengths, angles and points
//! - `path`: vertex paths with arc segments and their flattening
//! - `transform`: device and pad placement
//! - `constants`: tolerances shared by the whole engine
//! - `clip`: boolean and offset operations on regions

mod constants;
mod path;
mod transform;
mod units;

pub mod clip;

pub use clip::{Fragment, Region};
pub use constants::{MAX_ARC_TOLERANCE, MAX_COORDINATE, MIN_FRAGMENT_AREA};
pub use path::{arc_step, points_bounds, Path, Vertex};
pub use transform::Transform;
pub use units::{Angle, Length, Point};
