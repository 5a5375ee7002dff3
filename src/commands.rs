//! Requests accepted from a front end
//!
//! A front end submits planners as [`PlannerRequest`]s and presses
//! [`Button`]s; both deserialize from the JSON the web client posts.

use crate::worker::WorkerConfig;
use sandtable_core::{PlannerError, Waypoint};
use sandtable_planner::{Planner, SpiralPlanner, WaypointOptions, WaypointPlanner, DEFAULT_ROTATION_DEG};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn default_rotation() -> f64 {
    DEFAULT_ROTATION_DEG
}

fn default_passes() -> u32 {
    1
}

/// A planner to build and queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "lowercase")]
pub enum PlannerRequest {
    /// Draw a polyline
    General {
        /// `[x, y]` pairs in mm
        waypoints: Vec<[f64; 2]>,
        /// Accuracy target in mm²; the worker default applies when absent
        #[serde(default)]
        accuracy: Option<f64>,
        /// Rotation between passes in degrees
        #[serde(default = "default_rotation")]
        rotate_deg: f64,
        /// Number of passes
        #[serde(default = "default_passes")]
        passes: u32,
    },
    /// Spiral about the center
    Spiral {
        /// Start radius in mm
        r0: f64,
        /// End radius in mm
        r1: f64,
        /// Number of revolutions
        revolutions: f64,
    },
}

impl PlannerRequest {
    /// Drawing request with default rotation and a single pass
    pub fn general(waypoints: impl IntoIterator<Item = Waypoint>) -> Self {
        PlannerRequest::General {
            waypoints: waypoints.into_iter().map(|p| [p.x, p.y]).collect(),
            accuracy: None,
            rotate_deg: DEFAULT_ROTATION_DEG,
            passes: 1,
        }
    }

    /// Build the planner. Precondition failures are reported here, before
    /// anything is queued.
    pub fn build(&self, config: &WorkerConfig) -> Result<Planner, PlannerError> {
        match self {
            PlannerRequest::General {
                waypoints,
                accuracy,
                rotate_deg,
                passes,
            } => {
                let options = WaypointOptions::default()
                    .with_accuracy(accuracy.unwrap_or(config.default_accuracy))
                    .with_rotation(*rotate_deg)
                    .with_passes(*passes)
                    .with_geometry(config.geometry);
                let waypoints = waypoints.iter().copied().map(Waypoint::from).collect();
                Ok(WaypointPlanner::new(waypoints, options)?.into())
            }
            PlannerRequest::Spiral {
                r0,
                r1,
                revolutions,
            } => Ok(SpiralPlanner::with_density(
                *r0,
                *r1,
                *revolutions,
                config.spiral_samples_per_revolution,
                config.geometry,
            )?
            .into()),
        }
    }
}

/// Control buttons of the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Run the homing routine
    Home,
    /// Start executing buffered positions
    Start,
    /// Stop after the current move
    Stop,
    /// Stop and drop buffered positions
    Clear,
}

impl FromStr for Button {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" => Ok(Button::Home),
            "start" => Ok(Button::Start),
            "stop" => Ok(Button::Stop),
            "clear" => Ok(Button::Clear),
            other => Err(format!("unknown button '{}'", other)),
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Button::Home => "home",
            Button::Start => "start",
            Button::Stop => "stop",
            Button::Clear => "clear",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_request_from_json() {
        let request: PlannerRequest = serde_json::from_str(
            r#"{"engine": "general", "waypoints": [[0, 0], [10, 0], [10, 10]], "passes": 3}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            PlannerRequest::General {
                waypoints: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
                accuracy: None,
                rotate_deg: 5.0,
                passes: 3,
            }
        );

        let planner = request.build(&WorkerConfig::default()).unwrap();
        assert_eq!(planner.kind(), "general");
    }

    #[test]
    fn test_spiral_request_from_json() {
        let request: PlannerRequest =
            serde_json::from_str(r#"{"engine": "spiral", "r0": 0, "r1": 150, "revolutions": 20}"#)
                .unwrap();
        let planner = request.build(&WorkerConfig::default()).unwrap();
        assert_eq!(planner.kind(), "spiral");
        assert_eq!(planner.steps().len(), 41);
    }

    #[test]
    fn test_build_rejects_out_of_reach() {
        let request = PlannerRequest::general([Waypoint::new(0.0, 0.0), Waypoint::new(300.0, 0.0)]);
        assert!(matches!(
            request.build(&WorkerConfig::default()),
            Err(PlannerError::RadiusLimit { index: 1, .. })
        ));

        let spiral = PlannerRequest::Spiral {
            r0: 0.0,
            r1: 100.0,
            revolutions: -1.0,
        };
        assert!(spiral.build(&WorkerConfig::default()).is_err());
    }

    #[test]
    fn test_button_parsing() {
        assert_eq!("home".parse::<Button>().unwrap(), Button::Home);
        assert_eq!(" Clear ".parse::<Button>().unwrap(), Button::Clear);
        assert!("jog".parse::<Button>().is_err());
        assert_eq!(Button::Stop.to_string(), "stop");

        let button: Button = serde_json::from_str("\"start\"").unwrap();
        assert_eq!(button, Button::Start);
    }
}
