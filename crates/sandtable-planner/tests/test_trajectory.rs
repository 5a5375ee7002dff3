use proptest::prelude::*;
use sandtable_core::Waypoint;
use sandtable_planner::geometry::{circular_mean, deltas, unwrap_angles};
use sandtable_planner::{calc_trajectory, Accuracy};
use std::f64::consts::{PI, TAU};

fn point() -> impl Strategy<Value = Waypoint> {
    (-240.0f64..240.0, -240.0f64..240.0).prop_map(|(x, y)| Waypoint::new(x, y))
}

proptest! {
    #[test]
    fn trajectory_keeps_endpoints(p0 in point(), p1 in point(), eps in 0.05f64..50.0) {
        let points = calc_trajectory(p0, p1, Accuracy::new(eps).unwrap());
        prop_assert!(points.len() >= 3);
        prop_assert_eq!(points[0], p0);
        prop_assert_eq!(*points.last().unwrap(), p1);
    }

    #[test]
    fn trajectory_has_no_repeated_joints(p0 in point(), p1 in point(), eps in 0.05f64..50.0) {
        prop_assume!(p0 != p1);
        let points = calc_trajectory(p0, p1, Accuracy::new(eps).unwrap());
        for pair in points.windows(2) {
            prop_assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn smaller_eps_never_gives_fewer_points(
        p0 in point(),
        p1 in point(),
        eps in 0.05f64..50.0,
        factor in 0.01f64..1.0,
    ) {
        let coarse = calc_trajectory(p0, p1, Accuracy::new(eps).unwrap());
        let fine = calc_trajectory(p0, p1, Accuracy::new(eps * factor).unwrap());
        prop_assert!(fine.len() >= coarse.len());
    }

    #[test]
    fn circular_mean_of_equal_angles(phi in -10.0f64..10.0) {
        let mean = circular_mean(phi, phi);
        let diff = (mean - phi).rem_euclid(TAU);
        prop_assert!(diff < 1e-9 || TAU - diff < 1e-9);
    }

    #[test]
    fn unwrap_then_diff_reconstructs_rotation(
        start in -PI..PI,
        increments in prop::collection::vec(0.0f64..3.0, 1..60),
    ) {
        // Monotonic rotation sampled with steps below half a turn
        let mut true_angles = vec![start];
        for inc in &increments {
            let last = *true_angles.last().unwrap();
            true_angles.push(last + inc);
        }
        let wrapped: Vec<f64> = true_angles
            .iter()
            .map(|a| a.sin().atan2(a.cos()))
            .collect();

        let unwrapped = unwrap_angles(&wrapped);
        let total: f64 = deltas(&unwrapped).iter().sum();
        let expected = true_angles.last().unwrap() - true_angles[0];
        prop_assert!((total - expected).abs() < 1e-6);
    }
}

#[test]
fn corner_waypoints_survive_subdivision() {
    let waypoints = [
        Waypoint::new(0.0, 0.0),
        Waypoint::new(10.0, 0.0),
        Waypoint::new(10.0, 10.0),
    ];
    let points = sandtable_planner::subdivide_polyline(&waypoints, Some(Accuracy::new(1.0).unwrap()));

    for corner in &waypoints {
        assert!(points.contains(corner), "missing corner {}", corner);
    }
    assert_eq!(points.first(), Some(&waypoints[0]));
    assert_eq!(points.last(), Some(&waypoints[2]));
    // The vertical leg sweeps 45 degrees and has to be split
    assert!(points.len() > 5);
}
