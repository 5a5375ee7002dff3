//! # Sand Table Planner
//!
//! Converts drawings into the polar step commands a sand table follows.
//!
//! - [`geometry`]: triangle area, circular mean, angle unwrapping
//! - [`trajectory`]: accuracy-bounded subdivision of straight segments
//! - [`WaypointPlanner`]: arbitrary drawings, repeated with a rotation per pass
//! - [`SpiralPlanner`]: closed-form spiral about the center
//! - [`Planner`]: the closed set of planners the worker drains
//! - [`import`]: SVG path import

pub mod cursor;
pub mod geometry;
pub mod import;
pub mod planner;
pub mod spiral;
pub mod trajectory;
pub mod waypoint;

pub use cursor::Produced;
pub use import::{parse_path_data, SvgImporter};
pub use planner::Planner;
pub use spiral::{
    CoordinateSystem, SpiralPlanner, DEFAULT_SAMPLES_PER_REVOLUTION, MAX_SPIRAL_SEGMENTS,
};
pub use trajectory::{calc_trajectory, subdivide_polyline, Accuracy};
pub use waypoint::{WaypointOptions, WaypointPlanner, DEFAULT_ROTATION_DEG};
