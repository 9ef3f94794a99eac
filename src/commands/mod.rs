//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `pipeline.rs` — preprocess/analyze commands.
//! - `report.rs` — top listing and monthly page rendering.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Keep behavior and output schema stable.

pub mod pipeline;
pub mod report;

pub use pipeline::handle_pipeline_commands;
pub use report::handle_report_commands;
