use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use threatscry_core::model::TechnicalAsset;
use threatscry_core::AnalysisReport;
use tracing::info;

pub const RISKS: &str = "risks.json";
pub const TECHNICAL_ASSETS: &str = "technical-assets.json";
pub const STATS: &str = "stats.json";

/// Write the JSON reports of `report` into `dir`, creating it when missing.
pub fn write_reports(dir: &Path, report: &AnalysisReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))?;
    let assets: Vec<&TechnicalAsset> = report.model.technical_assets.values().collect();
    Ok(vec![
        write_json(dir, RISKS, &report.risks)?,
        write_json(dir, TECHNICAL_ASSETS, &assets)?,
        write_json(dir, STATS, &report.statistics)?,
    ])
}

/// Temp file plus rename, so readers never see a half written report.
fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(value).with_context(|| format!("serializing {name}"))?;
    let tmp = dir.join(format!(".{name}.tmp"));
    let path = dir.join(name);
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
    info!(path = %path.display(), "wrote report");
    Ok(path)
}
