// src/health/mod.rs
mod coordinator;
mod prober;
mod scheduler;

pub use coordinator::{SweepCoordinator, SweepReport, SweepTrigger};
pub use prober::{classify, HttpProber, Probe, ProbeOutcome};
pub use scheduler::{Scheduler, SchedulerState};
