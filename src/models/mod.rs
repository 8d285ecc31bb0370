//! Data models for Roadcare

pub mod analytics;
pub mod auth;
pub mod dispatch;
pub mod import_report;
pub mod occurrence;
pub mod review;
pub mod service_bay;
pub mod step;

// Re-export commonly used types
pub use dispatch::{Dispatch, DispatchStatus};
pub use occurrence::{Dealership, Occurrence, OccurrenceDetails};
pub use service_bay::{ServiceBay, ServiceBaySchedule};
pub use step::{Step, StepId};
