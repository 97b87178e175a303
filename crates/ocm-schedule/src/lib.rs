//! ocm-schedule
//!
//! Control of the external trigger rule that fires the fetch job.
//! - [`service`]: the trigger-service contract plus file-backed and in-memory backends.
//! - [`controller`]: select the collector's rule by name markers and toggle it.

pub mod controller;
pub mod service;

pub use controller::{RuleToggle, ScheduleController, ScheduleError};
pub use service::{FileTriggerService, MemoryTriggerService, RuleState, TriggerRule, TriggerService};
