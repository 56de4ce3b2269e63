use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride, Usage,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "path-traversal",
    title: "Path-Traversal",
    description: "When a filesystem is accessed Path-Traversal or Local-File-Inclusion (LFI) risks might arise. The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed or stored.",
    impact: "If this risk is unmitigated, attackers might be able to read sensitive files (configuration data, key/credential files, deployment files, business data files, etc.) from the filesystem of affected components.",
    asvs: "V12 - File and Resources Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Input_Validation_Cheat_Sheet.html",
    action: "Path-Traversal Prevention",
    mitigation: "Before accessing the file cross-check that it resides in the expected folder and is of the expected type and filename/suffix. Try to use a mapping if possible instead of directly accessing by a filename which is (partly or fully) provided by the caller. When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Development,
    stride: Stride::InformationDisclosure,
    detection_logic: "Filesystems accessed by in-scope callers.",
    risk_assessment: "The risk rating depends on the sensitivity of the data stored inside the technical asset.",
    false_positives: "File accesses by filenames not consisting of parts controllable by the caller can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 22,
};

pub struct PathTraversal;

impl RiskRule for PathTraversal {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for filesystem in model.technical_assets.values().filter(|asset| {
            matches!(asset.technology, Technology::FileServer | Technology::LocalFileSystem)
        }) {
            let impact = if filesystem.highest_confidentiality(model) == Confidentiality::StrictlyConfidential
                || filesystem.highest_integrity(model) == Criticality::MissionCritical
            {
                RiskExploitationImpact::High
            } else {
                RiskExploitationImpact::Medium
            };
            for link in model.incoming_links(&filesystem.id) {
                let Some(caller) = model.technical_asset(&link.source_id) else {
                    continue;
                };
                if caller.out_of_scope {
                    continue;
                }
                let likelihood = if link.usage == Usage::DevOps {
                    RiskExploitationLikelihood::Likely
                } else {
                    RiskExploitationLikelihood::VeryLikely
                };
                risks.push(
                    Risk::new(
                        INFO.id,
                        likelihood,
                        impact,
                        format!(
                            "Path-Traversal risk at {} against filesystem {} via {}",
                            caller.title, filesystem.title, link.title
                        ),
                    )
                    .technical_asset(&caller.id)
                    .communication_link(&link.id)
                    .breach(DataBreachProbability::Probable, vec![filesystem.id.clone()])
                    .identified_by(&[&caller.id, &filesystem.id, &link.id]),
                );
            }
        }
        Ok(risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, data, ids, link, run, Fixture};
    use crate::types::RiskSeverity;

    #[test]
    fn file_access_from_application() {
        let mut files = asset("files", Technology::FileServer);
        files.data_assets_stored = vec!["contracts".to_string()];
        let mut upload = link("app", "Upload", "files", Protocol::Sftp);
        upload.data_assets_sent = vec!["contracts".to_string()];
        let mut backup = link("ops", "Backup", "files", Protocol::Sftp);
        backup.usage = Usage::DevOps;
        let model = Fixture::new()
            .data(data("contracts", Confidentiality::StrictlyConfidential, Criticality::Important))
            .asset(files)
            .asset(asset("app", Technology::WebApplication))
            .asset(asset("ops", Technology::DevOpsClient))
            .link(upload)
            .link(backup)
            .build();

        let risks = run(&PathTraversal, model);
        assert_eq!(
            ids(&risks),
            vec![
                "path-traversal@app@files@app>upload",
                "path-traversal@ops@files@ops>backup",
            ]
        );
        assert_eq!(risks[0].severity, RiskSeverity::High);
        assert_eq!(risks[1].exploitation_likelihood, RiskExploitationLikelihood::Likely);
    }
}
