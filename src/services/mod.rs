//! Service layer containing the analysis pipeline and side-effect helpers.
//!
//! ## Service map
//! - `preprocess.rs` — keyring dump scan, status classification, graph file.
//! - `graph.rs` — signature graph, SCC, reachability, MSD computation.
//! - `analyze.rs` — per-period analysis orchestration and artifact writing.
//! - `reports.rs` — individual key reports + raw MSD listings.
//! - `html.rs` — page header helper and the monthly report page renderer.
//! - `storage.rs` — period layout, summary/config/name-table persistence.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod analyze;
pub mod graph;
pub mod html;
pub mod output;
pub mod preprocess;
pub mod reports;
pub mod storage;
