//! The closed set of planners the worker can drain

use crate::cursor::Produced;
use crate::spiral::SpiralPlanner;
use crate::waypoint::WaypointPlanner;
use sandtable_core::StepCommand;
use std::fmt;

/// A trajectory planner: a single-owner producer of step commands.
#[derive(Debug, Clone)]
pub enum Planner {
    /// Arbitrary drawing with adaptive subdivision and repeated passes
    General(WaypointPlanner),
    /// Spiral about the table center
    Spiral(SpiralPlanner),
}

impl Planner {
    /// Produce the next value. Returns [`Produced::Done`] forever once exhausted.
    pub fn produce(&mut self) -> Produced {
        match self {
            Planner::General(p) => p.produce(),
            Planner::Spiral(p) => p.produce(),
        }
    }

    /// Step commands of a single pass
    pub fn steps(&self) -> &[StepCommand] {
        match self {
            Planner::General(p) => p.steps(),
            Planner::Spiral(p) => p.steps(),
        }
    }

    /// Short name of the variant, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Planner::General(_) => "general",
            Planner::Spiral(_) => "spiral",
        }
    }
}

impl From<WaypointPlanner> for Planner {
    fn from(planner: WaypointPlanner) -> Self {
        Planner::General(planner)
    }
}

impl From<SpiralPlanner> for Planner {
    fn from(planner: SpiralPlanner) -> Self {
        Planner::Spiral(planner)
    }
}

impl Iterator for Planner {
    type Item = StepCommand;

    fn next(&mut self) -> Option<StepCommand> {
        self.produce().command()
    }
}

impl fmt::Display for Planner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Planner::General(p) => fmt::Display::fmt(p, f),
            Planner::Spiral(p) => fmt::Display::fmt(p, f),
        }
    }
}
