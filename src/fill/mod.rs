//! Plane fill engine
//!
//! Submodules:
//! - `job`: the immutable build request and its obstacle shapes
//! - `extract`: board snapshot into a job
//! - `builder`: the per-layer fill pipeline
//! - `thermal`: thermal relief spokes
//! - `result`: fragments, warnings and events
//! - `controller`: synchronous and background execution with commit

mod builder;
mod controller;
mod extract;
mod result;
mod thermal;

pub mod job;

pub use builder::build_fragments;
pub use controller::PlaneFragmentsBuilder;
pub use extract::create_job;
pub use job::{Job, Obstacle, ObstacleKind, PlaneData, Shape};
pub use result::{BuildStatus, BuildSummary, BuilderEvent, FillWarning, FragmentResult};
