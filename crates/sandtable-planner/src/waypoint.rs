//! General waypoint planner
//!
//! Turns a Cartesian polyline into polar step commands, subdividing each
//! segment until it is drawn within the accuracy target, and repeats the
//! pattern for a number of passes with a fixed rotation between them.

use crate::cursor::{Produced, StepCursor};
use crate::geometry::{deltas, to_polar_unwrapped};
use crate::trajectory::{subdivide_polyline, Accuracy};
use sandtable_core::{MachineGeometry, PlannerError, PolarSample, StepCommand, Waypoint};
use std::fmt;

/// Default rotation applied between passes, in degrees
pub const DEFAULT_ROTATION_DEG: f64 = 5.0;

/// Options for [`WaypointPlanner`]
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointOptions {
    /// Largest tolerated deviation area in mm². `None` keeps the waypoints as given.
    pub accuracy: Option<f64>,
    /// Rotation of the pattern between passes, in degrees
    pub rotation_deg: f64,
    /// Number of passes (at least 1)
    pub passes: u32,
    /// Machine scale factors
    pub geometry: MachineGeometry,
}

impl Default for WaypointOptions {
    fn default() -> Self {
        Self {
            accuracy: None,
            rotation_deg: DEFAULT_ROTATION_DEG,
            passes: 1,
            geometry: MachineGeometry::default(),
        }
    }
}

impl WaypointOptions {
    /// Set the accuracy target
    pub fn with_accuracy(mut self, eps: f64) -> Self {
        self.accuracy = Some(eps);
        self
    }

    /// Set the rotation between passes
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_deg = degrees;
        self
    }

    /// Set the number of passes
    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes;
        self
    }

    /// Set the machine scale factors
    pub fn with_geometry(mut self, geometry: MachineGeometry) -> Self {
        self.geometry = geometry;
        self
    }
}

/// Planner for an arbitrary drawing.
#[derive(Debug, Clone)]
pub struct WaypointPlanner {
    waypoints: Vec<Waypoint>,
    points: Vec<Waypoint>,
    polar: Vec<PolarSample>,
    rotation_steps: i32,
    cursor: StepCursor,
}

impl WaypointPlanner {
    /// Plan a drawing.
    ///
    /// Fails if there are no waypoints, if any waypoint is out of reach, if
    /// the accuracy is not a positive number, or if `passes` is zero.
    pub fn new(waypoints: Vec<Waypoint>, options: WaypointOptions) -> Result<Self, PlannerError> {
        if waypoints.is_empty() {
            return Err(PlannerError::NoWaypoints);
        }
        if options.passes == 0 {
            return Err(PlannerError::InvalidPasses { passes: 0 });
        }

        let geometry = options.geometry;
        if let Some((index, radius_mm)) = waypoints
            .iter()
            .map(Waypoint::radius)
            .enumerate()
            .find(|(_, r)| !geometry.within_reach(*r))
        {
            return Err(PlannerError::RadiusLimit {
                index,
                radius_mm,
                limit_mm: geometry.radius_limit_mm,
            });
        }

        let accuracy = options.accuracy.map(Accuracy::new).transpose()?;
        let points = subdivide_polyline(&waypoints, accuracy);
        let polar = to_polar_unwrapped(&points);

        let angles: Vec<f64> = polar.iter().map(|p| p.phi).collect();
        let steps: Vec<StepCommand> = polar
            .iter()
            .zip(deltas(&angles))
            .map(|(sample, dphi)| {
                StepCommand::new(
                    geometry.radius_to_steps(sample.r),
                    geometry.angle_to_steps(dphi),
                )
            })
            .collect();

        let rotation_steps = geometry.degrees_to_steps(options.rotation_deg);
        let end_of_pass = StepCommand::new(steps[0].r_steps, rotation_steps);

        tracing::debug!(
            "Planned {} waypoints into {} steps ({} passes)",
            waypoints.len(),
            steps.len(),
            options.passes
        );

        Ok(Self {
            waypoints,
            points,
            polar,
            rotation_steps,
            cursor: StepCursor::new(steps, Some(end_of_pass), options.passes),
        })
    }

    /// Produce the next value
    pub fn produce(&mut self) -> Produced {
        self.cursor.next()
    }

    /// Waypoints as given
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Waypoints plus subdivision points
    pub fn points(&self) -> &[Waypoint] {
        &self.points
    }

    /// Calculated points in polar form with a continuous angle
    pub fn polar_samples(&self) -> &[PolarSample] {
        &self.polar
    }

    /// Step commands of one pass
    pub fn steps(&self) -> &[StepCommand] {
        self.cursor.steps()
    }

    /// Rotation between passes in angular steps
    pub fn rotation_steps(&self) -> i32 {
        self.rotation_steps
    }

    /// Configured number of passes
    pub fn passes(&self) -> u32 {
        self.cursor.passes()
    }

    /// Passes fully produced so far
    pub fn completed_passes(&self) -> u32 {
        self.cursor.completed_passes()
    }
}

impl fmt::Display for WaypointPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WaypointPlanner: {} initial points, {} calculated points, {} passes",
            self.waypoints.len(),
            self.points.len(),
            self.passes()
        )
    }
}
