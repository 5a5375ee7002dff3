//! Geometry helpers for planning in polar space
//!
//! Pure functions over Cartesian and polar points. Angles are radians.

use sandtable_core::{PolarSample, Waypoint};
use std::f64::consts::{PI, TAU};

/// Area of the triangle spanned by three points (shoelace formula).
pub fn triangle_area(a: Waypoint, b: Waypoint, c: Waypoint) -> f64 {
    0.5 * ((a.x - c.x) * (b.y - a.y) - (a.x - b.x) * (c.y - a.y)).abs()
}

/// Mean direction of two angles.
///
/// Averages the unit vectors rather than the raw values, so +179° and -179°
/// give 180° and not 0°.
pub fn circular_mean(phi0: f64, phi1: f64) -> f64 {
    let x = phi0.cos() + phi1.cos();
    let y = phi0.sin() + phi1.sin();
    y.atan2(x)
}

/// Remove 2π jumps from an angle sequence.
///
/// Every consecutive difference larger than π is replaced by its equivalent
/// in `[-π, π]`, so the result follows the shortest rotation between samples.
pub fn unwrap_angles(angles: &[f64]) -> Vec<f64> {
    let mut unwrapped = Vec::with_capacity(angles.len());
    let Some(&first) = angles.first() else {
        return unwrapped;
    };

    unwrapped.push(first);
    let mut correction = 0.0;

    for pair in angles.windows(2) {
        let delta = pair[1] - pair[0];
        let mut wrapped = (delta + PI).rem_euclid(TAU) - PI;
        // Keep a true half turn in the direction it was taken
        if wrapped == -PI && delta > 0.0 {
            wrapped = PI;
        }
        if delta.abs() >= PI {
            correction += wrapped - delta;
        }
        unwrapped.push(pair[1] + correction);
    }

    unwrapped
}

/// Consecutive differences of a sequence, with a leading zero.
///
/// The output has the same length as the input.
pub fn deltas(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(values.windows(2).map(|pair| pair[1] - pair[0]));
    out
}

/// Convert Cartesian points to polar samples with a continuous angle.
pub fn to_polar_unwrapped(points: &[Waypoint]) -> Vec<PolarSample> {
    let angles: Vec<f64> = points.iter().map(Waypoint::angle).collect();
    points
        .iter()
        .zip(unwrap_angles(&angles))
        .map(|(p, phi)| PolarSample::new(p.radius(), phi))
        .collect()
}
