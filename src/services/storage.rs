use crate::domain::models::{AnalysisSummary, ReportConfig, ScanStats};
use crate::keyring::{KeyId, KeyringError};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Current month in YYYYMM form, the default reporting period.
pub fn default_period() -> String {
    Utc::now().format("%Y%m").to_string()
}

pub fn validate_period(period: &str) -> Result<(), KeyringError> {
    if period.len() == 6 && period.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(KeyringError::BadPeriod(period.to_string()))
    }
}

pub fn period_dir(output_dir: &Path, period: &str) -> PathBuf {
    output_dir.join(period)
}

fn summary_path(output_dir: &Path, period: &str) -> PathBuf {
    period_dir(output_dir, period).join("summary.json")
}

pub fn load_summary(output_dir: &Path, period: &str) -> anyhow::Result<AnalysisSummary> {
    let path = summary_path(output_dir, period);
    if !path.exists() {
        return Err(KeyringError::MissingSummary(period.to_string()).into());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save_summary(output_dir: &Path, summary: &AnalysisSummary) -> anyhow::Result<()> {
    let path = summary_path(output_dir, &summary.period);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(summary)?)?;
    Ok(())
}

/// Report configuration: absent file means all defaults.
pub fn load_report_config(path: Option<&Path>) -> anyhow::Result<ReportConfig> {
    let Some(path) = path else {
        return Ok(ReportConfig::default());
    };
    if !path.exists() {
        debug!(path = %path.display(), "report config not found, using defaults");
        return Ok(ReportConfig::default());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

/// `keynames.csv` as written by preprocess; an absent file just means the
/// report's name column stays empty.
pub fn load_key_names(data_dir: &Path) -> anyhow::Result<HashMap<KeyId, String>> {
    let path = data_dir.join("keynames.csv");
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let mut names = HashMap::new();
    for line in std::fs::read_to_string(path)?.lines() {
        if let Some((id, name)) = line.split_once(';') {
            if let Ok(id) = id.parse::<KeyId>() {
                names.insert(id, name.to_string());
            }
        }
    }
    Ok(names)
}

/// `scan.json` counters from preprocess; absent means the general table of
/// the report only carries graph-derived numbers.
pub fn load_scan_stats(data_dir: &Path) -> anyhow::Result<Option<ScanStats>> {
    let path = data_dir.join("scan.json");
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}
