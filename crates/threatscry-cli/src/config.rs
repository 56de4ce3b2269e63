//! Optional `threatscry.toml` settings. Command line flags win over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use toml_edit::DocumentMut;
use tracing::debug;

pub const FILE_NAME: &str = "threatscry.toml";

const TEMPLATE: &str = r#"# threatscry configuration
#
# Values here are defaults for `threatscry analyze`; command line flags win.

# Directory the JSON reports are written to.
output = "threatscry-output"

# Risk rule ids that are not executed.
skip_risk_rules = []

# Keep going when risk tracking entries match no risk.
ignore_orphaned_risk_tracking = false

# Executables providing additional risk rules. Bare names are looked up on PATH.
custom_risk_rules_plugins = []

# Executable computing relative attacker attractiveness. The built-in
# calculation is used when unset.
# raa_plugin = "threatscry-raa"

# Seconds a single plugin call may take.
plugin_timeout_secs = 30
"#;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub output: Option<PathBuf>,
    pub skip_risk_rules: Vec<String>,
    pub ignore_orphaned_risk_tracking: bool,
    pub custom_risk_rules_plugins: Vec<String>,
    pub raa_plugin: Option<String>,
    pub plugin_timeout_secs: Option<u64>,
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml_edit::de::from_str(text)?)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load the explicit file, else `./threatscry.toml`, else
    /// `~/.threatscry/config.toml`. No file at all yields the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }
        let candidates = [Some(PathBuf::from(FILE_NAME)), global_config_path()];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                debug!(path = %path.display(), "using config file");
                return Self::read(&path);
            }
        }
        Ok(Self::default())
    }
}

pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".threatscry").join("config.toml"))
}

/// Commented config with the given values filled in.
pub fn template(output: Option<&Path>, raa_plugin: Option<&str>) -> Result<String> {
    let mut doc: DocumentMut = TEMPLATE.parse().context("parsing config template")?;
    if let Some(output) = output {
        doc["output"] = toml_edit::value(output.display().to_string());
    }
    if let Some(raa_plugin) = raa_plugin {
        doc["raa_plugin"] = toml_edit::value(raa_plugin);
    }
    Ok(doc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let config = Config::parse(&template(None, None).unwrap()).unwrap();
        assert_eq!(config.output, Some(PathBuf::from("threatscry-output")));
        assert!(config.skip_risk_rules.is_empty());
        assert_eq!(config.raa_plugin, None);
        assert_eq!(config.plugin_timeout_secs, Some(30));
    }

    #[test]
    fn template_keeps_comments_when_filled_in() {
        let text = template(Some(Path::new("reports")), Some("my-raa")).unwrap();
        assert!(text.contains("# Directory the JSON reports are written to."));
        let config = Config::parse(&text).unwrap();
        assert_eq!(config.output, Some(PathBuf::from("reports")));
        assert_eq!(config.raa_plugin.as_deref(), Some("my-raa"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("skip_rules = [\"x\"]").is_err());
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("reading config"));
    }
}
