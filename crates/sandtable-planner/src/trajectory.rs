//! Adaptive subdivision of straight segments
//!
//! The table moves both axes linearly in `(r, phi)` between two samples, so a
//! straight Cartesian segment is drawn as an arc. Each segment is split until
//! the triangle between its endpoints and the arc's midpoint is no larger
//! than the accuracy target.

use crate::geometry::{circular_mean, triangle_area};
use sandtable_core::{PlannerError, PolarSample, Waypoint};

/// Recursion depth at which a segment is accepted regardless of area.
/// Bounds one segment to `2^(MAX_SUBDIVISION_DEPTH + 1) + 1` points.
pub const MAX_SUBDIVISION_DEPTH: u32 = 16;

/// Accuracy target: the largest tolerated deviation area in mm².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accuracy(f64);

impl Accuracy {
    /// Validate an accuracy target. Must be finite and strictly positive.
    pub fn new(eps: f64) -> Result<Self, PlannerError> {
        if eps.is_finite() && eps > 0.0 {
            Ok(Self(eps))
        } else {
            Err(PlannerError::InvalidAccuracy { value: eps })
        }
    }

    /// Area threshold in mm²
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Accuracy {
    type Error = PlannerError;

    fn try_from(eps: f64) -> Result<Self, Self::Error> {
        Self::new(eps)
    }
}

/// Deviation area between the segment `p0..p1` and the path the table takes
/// when moving directly between their polar coordinates, measured at the
/// polar midpoint.
pub fn deviation_area(p0: Waypoint, p1: Waypoint) -> f64 {
    let a = p0.to_polar();
    let b = p1.to_polar();
    let polar_mid = PolarSample::new((a.r + b.r) / 2.0, circular_mean(a.phi, b.phi));
    triangle_area(p0, polar_mid.to_cartesian(), p1)
}

/// Points needed to draw the segment `p0..p1` within `eps`.
///
/// Always starts with `p0` and ends with `p1`; interior points are Cartesian
/// midpoints of recursively halved sub-segments. Shared joints appear once.
pub fn calc_trajectory(p0: Waypoint, p1: Waypoint, eps: Accuracy) -> Vec<Waypoint> {
    let mut points = vec![p0];
    subdivide(p0, p1, eps.value(), 0, &mut points);
    points
}

/// Appends everything after `p0` up to and including `p1`.
fn subdivide(p0: Waypoint, p1: Waypoint, eps: f64, depth: u32, out: &mut Vec<Waypoint>) {
    let mid = p0.midpoint(&p1);

    if depth < MAX_SUBDIVISION_DEPTH && deviation_area(p0, p1) > eps {
        subdivide(p0, mid, eps, depth + 1, out);
        subdivide(mid, p1, eps, depth + 1, out);
    } else {
        out.push(mid);
        out.push(p1);
    }
}

/// Subdivide every segment of a polyline and join the results.
///
/// Without an accuracy target the waypoints are returned unchanged.
pub fn subdivide_polyline(waypoints: &[Waypoint], eps: Option<Accuracy>) -> Vec<Waypoint> {
    let Some(eps) = eps else {
        return waypoints.to_vec();
    };

    let mut points: Vec<Waypoint> = Vec::with_capacity(waypoints.len() * 3);
    for (i, segment) in waypoints.windows(2).enumerate() {
        let piece = calc_trajectory(segment[0], segment[1], eps);
        let skip = if i == 0 { 0 } else { 1 };
        points.extend(piece.into_iter().skip(skip));
    }

    // A single waypoint has no segments
    if points.is_empty() {
        points.extend_from_slice(waypoints);
    }

    points
}
