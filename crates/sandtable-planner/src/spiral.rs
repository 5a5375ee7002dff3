//! Spiral about the table center
//!
//! Radius and angle both move linearly, which the table draws as an
//! Archimedean spiral without any subdivision.

use crate::cursor::{Produced, StepCursor};
use sandtable_core::{MachineGeometry, PlannerError, PolarSample, StepCommand};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Default number of step commands per revolution
pub const DEFAULT_SAMPLES_PER_REVOLUTION: u32 = 2;

/// Largest number of segments a spiral, or a plot of one, may be split into
pub const MAX_SPIRAL_SEGMENTS: usize = 1_000_000;

/// Coordinate system for [`SpiralPlanner::sample_points`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// `[r, phi]` pairs
    Polar,
    /// `[x, y]` pairs
    Cartesian,
}

impl FromStr for CoordinateSystem {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "polar" => Ok(Self::Polar),
            "cartesian" => Ok(Self::Cartesian),
            _ => Err(PlannerError::InvalidSampling {
                reason: format!("coordinate system '{}' is not supported", s),
            }),
        }
    }
}

/// Single-pass spiral from `r0` to `r1`.
#[derive(Debug, Clone)]
pub struct SpiralPlanner {
    r0: f64,
    r1: f64,
    revolutions: f64,
    polar: Vec<PolarSample>,
    cursor: StepCursor,
}

impl SpiralPlanner {
    /// Plan a spiral with the default sampling density
    pub fn new(r0: f64, r1: f64, revolutions: f64, geometry: MachineGeometry) -> Result<Self, PlannerError> {
        Self::with_density(r0, r1, revolutions, DEFAULT_SAMPLES_PER_REVOLUTION, geometry)
    }

    /// Plan a spiral sampled `samples_per_revolution` times per turn
    pub fn with_density(
        r0: f64,
        r1: f64,
        revolutions: f64,
        samples_per_revolution: u32,
        geometry: MachineGeometry,
    ) -> Result<Self, PlannerError> {
        for (name, r) in [("r0", r0), ("r1", r1)] {
            if !r.is_finite() || r < 0.0 {
                return Err(PlannerError::InvalidSpiral {
                    reason: format!("{} must be a non-negative number, got {}", name, r),
                });
            }
            if !geometry.within_reach(r) {
                return Err(PlannerError::RadiusLimit {
                    index: if name == "r0" { 0 } else { 1 },
                    radius_mm: r,
                    limit_mm: geometry.radius_limit_mm,
                });
            }
        }
        if !revolutions.is_finite() || revolutions <= 0.0 {
            return Err(PlannerError::InvalidSpiral {
                reason: format!("revolutions must be positive, got {}", revolutions),
            });
        }
        if samples_per_revolution == 0 {
            return Err(PlannerError::InvalidSpiral {
                reason: "at least one sample per revolution is required".to_string(),
            });
        }

        let segments = (revolutions * samples_per_revolution as f64).ceil().max(1.0);
        if segments > MAX_SPIRAL_SEGMENTS as f64 {
            return Err(PlannerError::InvalidSpiral {
                reason: format!(
                    "{} revolutions at {} samples each exceeds {} segments",
                    revolutions, samples_per_revolution, MAX_SPIRAL_SEGMENTS
                ),
            });
        }
        let segments = segments as usize;
        let total_angle = revolutions * TAU;

        let polar: Vec<PolarSample> = (0..=segments)
            .map(|i| {
                let t = i as f64 / segments as f64;
                PolarSample::new(r0 + (r1 - r0) * t, total_angle * t)
            })
            .collect();

        let mut steps = Vec::with_capacity(polar.len());
        let mut previous_phi = 0.0;
        for sample in &polar {
            steps.push(StepCommand::new(
                geometry.radius_to_steps(sample.r),
                geometry.angle_to_steps(sample.phi - previous_phi),
            ));
            previous_phi = sample.phi;
        }

        Ok(Self {
            r0,
            r1,
            revolutions,
            polar,
            cursor: StepCursor::new(steps, None, 1),
        })
    }

    /// Produce the next value
    pub fn produce(&mut self) -> Produced {
        self.cursor.next()
    }

    /// Start radius in mm
    pub fn r0(&self) -> f64 {
        self.r0
    }

    /// End radius in mm
    pub fn r1(&self) -> f64 {
        self.r1
    }

    /// Number of revolutions
    pub fn revolutions(&self) -> f64 {
        self.revolutions
    }

    /// Polar samples the step commands were built from
    pub fn polar_samples(&self) -> &[PolarSample] {
        &self.polar
    }

    /// Step commands
    pub fn steps(&self) -> &[StepCommand] {
        self.cursor.steps()
    }

    /// Evenly spaced points along the spiral for plotting.
    ///
    /// Returns `revolutions * pts_per_rev` points (truncated), as `[r, phi]`
    /// or `[x, y]` pairs. Not used for motion.
    pub fn sample_points(
        &self,
        cs: CoordinateSystem,
        pts_per_rev: u32,
    ) -> Result<Vec<[f64; 2]>, PlannerError> {
        if pts_per_rev == 0 {
            return Err(PlannerError::InvalidSampling {
                reason: "pts_per_rev must be at least 1".to_string(),
            });
        }

        let num = self.revolutions * pts_per_rev as f64;
        if num > MAX_SPIRAL_SEGMENTS as f64 {
            return Err(PlannerError::InvalidSampling {
                reason: format!("{} points exceeds the limit of {}", num, MAX_SPIRAL_SEGMENTS),
            });
        }
        let num = num as usize;
        let total_angle = self.revolutions * TAU;

        let points = (0..num)
            .map(|i| {
                let t = if num > 1 {
                    i as f64 / (num - 1) as f64
                } else {
                    0.0
                };
                let r = self.r0 + (self.r1 - self.r0) * t;
                let phi = total_angle * t;
                match cs {
                    CoordinateSystem::Polar => [r, phi],
                    CoordinateSystem::Cartesian => [r * phi.cos(), r * phi.sin()],
                }
            })
            .collect();

        Ok(points)
    }
}

impl fmt::Display for SpiralPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SpiralPlanner: r0 {}mm, r1 {}mm, {} revolutions",
            self.r0, self.r1, self.revolutions
        )
    }
}
