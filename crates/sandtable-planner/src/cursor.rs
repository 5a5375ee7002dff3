//! Pass-aware cursor over a precomputed step list

use sandtable_core::StepCommand;

/// One value from a planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produced {
    /// Next command of the current pass
    Step(StepCommand),
    /// Synthetic command closing a pass: back to the first radius, then
    /// rotate the whole pattern by the configured offset
    EndOfPass(StepCommand),
    /// All passes delivered; nothing more will be produced
    Done,
}

impl Produced {
    /// The command carried by this value, if any
    pub fn command(&self) -> Option<StepCommand> {
        match self {
            Produced::Step(cmd) | Produced::EndOfPass(cmd) => Some(*cmd),
            Produced::Done => None,
        }
    }
}

/// Walks a step list `passes` times.
///
/// When `end_of_pass` is set it is emitted after every pass, including the
/// last; otherwise passes are simply concatenated.
#[derive(Debug, Clone)]
pub(crate) struct StepCursor {
    steps: Vec<StepCommand>,
    end_of_pass: Option<StepCommand>,
    passes: u32,
    pass: u32,
    index: usize,
}

impl StepCursor {
    pub(crate) fn new(steps: Vec<StepCommand>, end_of_pass: Option<StepCommand>, passes: u32) -> Self {
        Self {
            steps,
            end_of_pass,
            passes,
            pass: 0,
            index: 0,
        }
    }

    pub(crate) fn steps(&self) -> &[StepCommand] {
        &self.steps
    }

    pub(crate) fn passes(&self) -> u32 {
        self.passes
    }

    pub(crate) fn completed_passes(&self) -> u32 {
        self.pass
    }

    pub(crate) fn next(&mut self) -> Produced {
        while self.pass < self.passes {
            if let Some(step) = self.steps.get(self.index) {
                self.index += 1;
                return Produced::Step(*step);
            }

            self.pass += 1;
            self.index = 0;

            if let Some(marker) = self.end_of_pass {
                return Produced::EndOfPass(marker);
            }
        }

        Produced::Done
    }
}
