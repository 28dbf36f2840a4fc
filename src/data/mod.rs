//! Data structures for kettle settings.
//!
//! This module contains the value types used to describe the kettle's
//! configuration: units, clock, language, schedule and the flattened
//! state summary.

pub mod schedule;
pub mod settings;
pub mod summary;

pub use schedule::{Schedule, ScheduleMode, ScheduleRequest};
pub use settings::{ClockMode, ClockTime, Language, Units};
pub use summary::{ScheduleSummary, StateSummary};
