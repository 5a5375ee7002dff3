//! Unit conversion utilities
//!
//! Converts between physical table units (mm, radians, degrees) and the
//! motor steps carried on the wire.

use serde::{Deserialize, Serialize};

/// Maximum radial reach of the table in mm
pub const RADIUS_LIMIT_MM: f64 = 250.0;

/// Radial motor steps per mm
pub const RADIUS_STEPS_PER_MM: f64 = 81.82;

/// Angular motor steps per radian of table rotation
pub const ANGLE_STEPS_PER_RAD: f64 = 4169.86;

/// Physical scale factors of one sand table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineGeometry {
    /// Maximum radius in mm (exclusive)
    pub radius_limit_mm: f64,
    /// Radial steps per mm
    pub radius_steps_per_mm: f64,
    /// Angular steps per radian
    pub angle_steps_per_rad: f64,
}

impl Default for MachineGeometry {
    fn default() -> Self {
        Self {
            radius_limit_mm: RADIUS_LIMIT_MM,
            radius_steps_per_mm: RADIUS_STEPS_PER_MM,
            angle_steps_per_rad: ANGLE_STEPS_PER_RAD,
        }
    }
}

impl MachineGeometry {
    /// Radius in mm to radial steps, truncated toward zero
    pub fn radius_to_steps(&self, radius_mm: f64) -> i32 {
        (radius_mm * self.radius_steps_per_mm) as i32
    }

    /// Angle in radians to angular steps, truncated toward zero
    pub fn angle_to_steps(&self, angle_rad: f64) -> i32 {
        (angle_rad * self.angle_steps_per_rad) as i32
    }

    /// Angle in degrees to angular steps, truncated toward zero
    pub fn degrees_to_steps(&self, angle_deg: f64) -> i32 {
        self.angle_to_steps(angle_deg.to_radians())
    }

    /// Whether a radius is inside the reachable area
    pub fn within_reach(&self, radius_mm: f64) -> bool {
        radius_mm < self.radius_limit_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_radius_conversion() {
        let geometry = MachineGeometry::default();
        assert_eq!(geometry.radius_to_steps(10.0), 818);
        assert_eq!(geometry.radius_to_steps(0.0), 0);
    }

    #[test]
    fn test_angle_conversion_truncates() {
        let geometry = MachineGeometry::default();
        // 5 degrees = 0.0872665 rad = 363.9 steps
        assert_eq!(geometry.degrees_to_steps(5.0), 363);
        assert_eq!(geometry.angle_to_steps(-PI / 180.0 * 5.0), -363);
    }

    #[test]
    fn test_reach_is_exclusive() {
        let geometry = MachineGeometry::default();
        assert!(geometry.within_reach(249.999));
        assert!(!geometry.within_reach(250.0));
    }
}
