//! Core of the optic planning service: payload normalization, per-request
//! workspaces, and bounded execution of the external planner.

pub mod planner;
pub mod service;
pub mod source;
pub mod workspace;

pub use planner::{InvocationOutcome, PlannerConfig, PlannerInvoker};
pub use service::{PlanService, ServiceConfig};
pub use source::{PddlSource, PlanRequest};
