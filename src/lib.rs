//! Copper plane fill engine for printed circuit boards
//!
//! Computes the filled copper ("fragments") of every plane on a board from
//! its outline, the surrounding copper, holes and keepouts, clearance rules
//! and the plane's connect style.
//!
//! - [`geometry`]: fixed-point units, paths and the clipping facade
//! - [`board`]: the board model the engine reads and writes
//! - [`fill`]: snapshot extraction, the fill pipeline and the controller
//!
//! ```ignore
//! let mut builder = PlaneFragmentsBuilder::new();
//! let events = builder.subscribe();
//! builder.start_asynchronously(&board, None);
//! // ... later, on the thread owning the board
//! if let Some(status) = builder.poll(&mut board) {
//!     println!("{:?}", status);
//! }
//! ```

pub mod board;
pub mod error;
pub mod fill;
pub mod geometry;

pub use error::{ClipError, FillError};
pub use fill::{BuildStatus, BuilderEvent, PlaneFragmentsBuilder};
