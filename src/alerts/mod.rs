//! Overdue cleaning alerts
//!
//! - `policy`: pure predicates (alert day, business hours, overdue, cooldown)
//! - `runner`: the per-washroom dispatch loop behind the cron endpoint

pub mod policy;
mod runner;

pub use policy::{AlertPolicy, AlertStatus, BusinessHours, Decision};
pub use runner::{
    CheckReport, OverdueChecker, OverdueStatus, RunTrigger, WashroomResult, collect_recipients,
};
