//! Hiring workflow engine: stage transitions, field visibility, phase resolution, and
//! stage change events for a multi-tenant applicant tracking system.

pub mod config;
pub mod error;
pub mod hiring;
pub mod telemetry;
