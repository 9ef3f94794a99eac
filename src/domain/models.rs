use crate::keyring::KeyId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

/// Raw keyring counters collected while preprocessing the dump.
///
/// Written as `scan.json` next to the preprocessed file so that a later
/// `analyze` run can carry them into the period summary.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct ScanStats {
    pub keyring_bytes: u64,
    pub total_keys: u64,
    pub usable_keys: u64,
    pub total_sigs: u64,
}

/// "The strong set" table of the monthly report.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct StrongSetStats {
    /// Size of the largest strongly connected component.
    pub size: u64,
    /// Distinct keys with at least one signature on a strong-set member.
    pub signers: u64,
    /// Keys reachable from the strong set; the target set of MSD runs.
    pub signed: u64,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct MsdStats {
    /// Mean MSD over strong-set members.
    pub average: f64,
    /// Median MSD over strong-set members.
    pub median: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TopKey {
    pub rank: u32,
    pub key_id: KeyId,
    #[serde(default)]
    pub name: String,
    pub msd: f64,
}

/// Everything the report page needs from one analysis run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisSummary {
    pub period: String,
    pub general: ScanStats,
    pub strong: StrongSetStats,
    pub msd: MsdStats,
    pub top: Vec<TopKey>,
}

fn default_index_url() -> String {
    "index.html".to_string()
}

fn default_explanation_url() -> String {
    "explanation.html".to_string()
}

fn default_faq_url() -> String {
    "keyfaq.html".to_string()
}

/// Report page configuration, loaded from a TOML file.
///
/// All fields default so that `report` works without a config; the comments
/// table keys are 16-hex key IDs and feed the top-50 Comments column.
#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    /// Overrides the "wotstat <Month Year>" page title.
    #[serde(default)]
    pub title: Option<String>,
    /// ISO date the keyring was exported; shown in the heading and prose.
    #[serde(default)]
    pub export_date: Option<String>,
    #[serde(default)]
    pub keyserver: Option<String>,
    #[serde(default)]
    pub keyserver_web_url: Option<String>,
    #[serde(default = "default_index_url")]
    pub index_url: String,
    #[serde(default = "default_explanation_url")]
    pub explanation_url: String,
    #[serde(default = "default_faq_url")]
    pub faq_url: String,
    #[serde(default)]
    pub new_this_month: Option<String>,
    #[serde(default)]
    pub comments: BTreeMap<String, String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: None,
            export_date: None,
            keyserver: None,
            keyserver_web_url: None,
            index_url: default_index_url(),
            explanation_url: default_explanation_url(),
            faq_url: default_faq_url(),
            new_this_month: None,
            comments: BTreeMap::new(),
        }
    }
}

/// Row of the `top` command output.
#[derive(Serialize)]
pub struct TopRow {
    pub rank: u32,
    pub key_id: String,
    pub short_id: String,
    pub name: String,
    pub msd: f64,
}

/// Outcome of a `preprocess` run, for command output.
#[derive(Serialize)]
pub struct PreprocessReport {
    pub scan: ScanStats,
    pub dropped_keys: u64,
    pub preprocessed_path: String,
}
