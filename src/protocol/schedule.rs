//! Schedule transition planning.
//!
//! Switching an active schedule directly between once and daily is not
//! accepted by the kettle. The schedule has to be disabled first, given a
//! moment to settle, and then enabled with the new submode.

use crate::data::{ScheduleMode, ScheduleRequest};
use crate::error::Result;
use crate::protocol::codec;
use crate::protocol::payload::RawRecord;
use crate::protocol::record::StateRecord;

/// One physical write of a schedule change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduleStep {
    /// Clear the enabled bit and write the disabled schedule bytes.
    Disable,
    /// Set the enabled bit, submode, time and temperature.
    Enable(ScheduleRequest),
}

impl ScheduleStep {
    /// Encode this step on top of `record`.
    pub fn encode(&self, record: &StateRecord) -> Result<RawRecord> {
        match self {
            Self::Disable => Ok(codec::disable_schedule(record)),
            Self::Enable(request) => codec::enable_schedule(record, request),
        }
    }
}

/// The ordered writes needed to move the schedule to a requested mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleTransition {
    from: ScheduleMode,
    steps: Vec<ScheduleStep>,
}

impl ScheduleTransition {
    /// Plan the writes that take the schedule from `current` to `request`.
    pub fn plan(current: ScheduleMode, request: &ScheduleRequest) -> Self {
        let steps = match (current, request.mode) {
            (_, ScheduleMode::Off) => vec![ScheduleStep::Disable],
            (ScheduleMode::Once, ScheduleMode::Daily) | (ScheduleMode::Daily, ScheduleMode::Once) => {
                vec![ScheduleStep::Disable, ScheduleStep::Enable(*request)]
            }
            _ => vec![ScheduleStep::Enable(*request)],
        };

        Self {
            from: current,
            steps,
        }
    }

    /// The mode the transition starts from.
    pub fn from_mode(&self) -> ScheduleMode {
        self.from
    }

    /// Writes to perform, in order.
    pub fn steps(&self) -> &[ScheduleStep] {
        &self.steps
    }

    /// Whether this is the two-write once/daily switch that needs a settle
    /// delay between its writes.
    pub fn is_mode_change(&self) -> bool {
        self.steps.len() > 1
    }
}
