//! Shared data model layer (structs/constants only).
//!
//! ## Purpose
//! - Keep summary/report structs in one place.
//! - Avoid cyclic imports and duplicated type definitions.
//! - Make JSON output schema changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs` — analysis summary, report config, output envelope structs.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem side effects.
//!
//! ## Compatibility note
//! `AnalysisSummary` is persisted as `summary.json` per period and read back
//! by the `top` and `report` commands, including for delta computation against
//! earlier months. Schema changes must stay readable across periods.

pub mod models;
