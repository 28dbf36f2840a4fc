//! Protocol module for decoding and encoding the kettle config record.
//!
//! This module contains the implementations for:
//! - The 17-byte record layout
//! - Record decoding
//! - Setting encoding and counter handling
//! - Schedule transition planning

pub mod codec;
pub mod payload;
pub mod record;
pub mod schedule;

pub use codec::{disable_schedule, enable_schedule, with_field, Setting};
pub use payload::{RawRecord, RECORD_LEN};
pub use record::StateRecord;
pub use schedule::{ScheduleStep, ScheduleTransition};
