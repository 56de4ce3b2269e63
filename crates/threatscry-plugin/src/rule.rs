use threatscry_core::{AnalysisContext, Risk, RiskCategory, RiskRule, RuleError};
use tracing::{debug, info};

use crate::contract::{PluginInfo, GENERATE_RISKS, GET_INFO};
use crate::error::PluginError;
use crate::runner::PluginRunner;

/// A risk rule implemented by an external executable.
///
/// The category is fetched once at load time, risks on every analysis run.
#[derive(Debug)]
pub struct PluginRule {
    runner: PluginRunner,
    info: PluginInfo,
}

impl PluginRule {
    pub fn load(runner: PluginRunner) -> Result<Self, PluginError> {
        let info: PluginInfo = runner.call_json(&[GET_INFO], b"")?;
        if info.id != info.category.id {
            return Err(PluginError::IdMismatch {
                plugin: runner.name().to_string(),
                announced: info.id,
                category: info.category.id,
            });
        }
        info!(plugin = %runner.name(), category = %info.id, "loaded risk rule plugin");
        Ok(PluginRule { runner, info })
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn call(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, PluginError> {
        let input = serde_json::to_vec(ctx.model()).map_err(|source| PluginError::Serialize {
            plugin: self.runner.name().to_string(),
            source,
        })?;
        let risks: Vec<Risk> = self.runner.call_json(&[GENERATE_RISKS], &input)?;
        debug!(plugin = %self.runner.name(), risks = risks.len(), "plugin generated risks");
        Ok(risks
            .into_iter()
            .map(|risk| {
                if risk.synthetic_id.is_empty() {
                    risk.with_composed_id()
                } else {
                    risk
                }
            })
            .collect())
    }
}

impl RiskRule for PluginRule {
    fn category(&self) -> RiskCategory {
        self.info.category.clone()
    }

    fn supported_tags(&self) -> Vec<String> {
        self.info.tags.clone()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        self.call(ctx).map_err(|err| RuleError::External(Box::new(err)))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use threatscry_core::parse_model;

    use super::*;

    const CATEGORY: &str = r#"{"id":"shell-rule","title":"Shell Rule","function":"architecture","stride":"tampering"}"#;

    const MODEL: &str = r#"
title: Plugin
date: 2024-01-01
business_criticality: important
technical_assets:
  Worker:
    id: worker
    type: process
    usage: business
    size: service
    technology: batch-processing
    machine: container
    encryption: none
    confidentiality: internal
    integrity: operational
    availability: operational
"#;

    fn plugin(dir: &tempfile::TempDir, info: &str, risks: &str) -> PluginRunner {
        let path: PathBuf = dir.path().join("shell-rule");
        let body = format!(
            "#!/bin/sh\ncase \"$1\" in\n--get-info) echo '{info}' ;;\n--generate-risks) cat > /dev/null; echo '{risks}' ;;\n*) exit 2 ;;\nesac\n"
        );
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        PluginRunner::new(path)
    }

    #[test]
    fn risks_without_id_get_a_composed_one() {
        let dir = tempfile::tempdir().unwrap();
        let info = format!(r#"{{"id":"shell-rule","category":{CATEGORY},"tags":["batch"]}}"#);
        let risks = r#"[{"category":"shell-rule","severity":"medium","exploitation_likelihood":"likely","exploitation_impact":"medium","title":"Worker is scripted","most_relevant_technical_asset":"worker","data_breach_probability":"possible"}]"#;
        let rule = PluginRule::load(plugin(&dir, &info, risks)).unwrap();
        assert_eq!(rule.category().title, "Shell Rule");
        assert_eq!(rule.supported_tags(), vec!["batch"]);

        let ctx = AnalysisContext::new(parse_model(MODEL).unwrap());
        let generated = rule.generate_risks(&ctx).unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].synthetic_id, "shell-rule@worker");
    }

    #[test]
    fn mismatching_announced_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let info = format!(r#"{{"id":"other-rule","category":{CATEGORY}}}"#);
        let err = PluginRule::load(plugin(&dir, &info, "[]")).unwrap_err();
        assert!(matches!(
            err,
            PluginError::IdMismatch { ref announced, ref category, .. }
                if announced == "other-rule" && category == "shell-rule"
        ));
    }

    #[test]
    fn garbage_risks_fail_the_rule() {
        let dir = tempfile::tempdir().unwrap();
        let info = format!(r#"{{"id":"shell-rule","category":{CATEGORY}}}"#);
        let rule = PluginRule::load(plugin(&dir, &info, "not json")).unwrap();
        let ctx = AnalysisContext::new(parse_model(MODEL).unwrap());
        let err = rule.generate_risks(&ctx).unwrap_err();
        assert!(err.to_string().contains("malformed output"));
    }
}
