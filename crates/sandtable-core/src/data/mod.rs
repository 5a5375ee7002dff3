//! Data models for the sand table
//!
//! Cartesian waypoints come from drawings, polar samples are what the
//! machine physically follows, and step commands are what the controller
//! understands on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A drawing point in millimeters, Cartesian, table center at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    /// X coordinate in mm
    pub x: f64,
    /// Y coordinate in mm
    pub y: f64,
}

impl Waypoint {
    /// Create a new waypoint
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance from the table center in mm
    pub fn radius(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Angle around the table center in radians, in `(-π, π]`
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Cartesian midpoint between two waypoints
    pub fn midpoint(&self, other: &Waypoint) -> Waypoint {
        Waypoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Convert to a polar sample (angle not yet unwrapped)
    pub fn to_polar(&self) -> PolarSample {
        PolarSample::new(self.radius(), self.angle())
    }
}

impl From<(f64, f64)> for Waypoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f64; 2]> for Waypoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// A point in table space: radius in mm, angle in radians.
///
/// Within one planner the angle is continuous, so consecutive samples may
/// leave the `(-π, π]` range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolarSample {
    /// Radius in mm
    pub r: f64,
    /// Angle in radians
    pub phi: f64,
}

impl PolarSample {
    /// Create a new polar sample
    pub const fn new(r: f64, phi: f64) -> Self {
        Self { r, phi }
    }

    /// Project back onto the Cartesian plane
    pub fn to_cartesian(&self) -> Waypoint {
        Waypoint::new(self.r * self.phi.cos(), self.r * self.phi.sin())
    }
}

/// One motion command as the controller receives it.
///
/// `r_steps` is absolute, `phi_delta_steps` is relative to the previous
/// command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StepCommand {
    /// Absolute radius in motor steps
    pub r_steps: i32,
    /// Angular move in motor steps since the previous command
    pub phi_delta_steps: i32,
}

impl StepCommand {
    /// Create a new step command
    pub const fn new(r_steps: i32, phi_delta_steps: i32) -> Self {
        Self {
            r_steps,
            phi_delta_steps,
        }
    }
}

impl fmt::Display for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[r={}, dphi={}]", self.r_steps, self.phi_delta_steps)
    }
}
