use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::TechnicalAsset;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-build-infrastructure",
    title: "Missing Build Infrastructure",
    description: "The modeled architecture does not contain a build infrastructure (devops-client, sourcecode-repo, build-pipeline, etc.), which might be the risk of a model missing critical assets (and thus not seeing their risks). If the architecture contains custom-developed parts, the pipeline where code gets developed and built needs to be part of the model.",
    impact: "If this risk is unmitigated, attackers might be able to exploit risks unseen in this threat model due to critical build infrastructure components missing in the model.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Build Pipeline Hardening",
    mitigation: "Include the build infrastructure in the model.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::Tampering,
    detection_logic: "Models with in-scope custom-developed parts missing in-scope development (code creation) and build infrastructure components (devops-client, sourcecode-repo, build-pipeline, etc.).",
    risk_assessment: "The risk rating depends on the highest sensitivity of the in-scope assets running custom-developed parts.",
    false_positives: "Models not having any custom-developed parts can be considered as false positives after individual review.",
    model_failure_possible_reason: true,
    cwe: 1127,
};

pub struct MissingBuildInfrastructure;

impl RiskRule for MissingBuildInfrastructure {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut impact = RiskExploitationImpact::Low;
        let mut most_relevant: Option<&TechnicalAsset> = None;
        let (mut pipeline, mut repository, mut devops_client) = (false, false, false);

        for asset in model.technical_assets.values() {
            if asset.custom_developed_parts && !asset.out_of_scope {
                if impact == RiskExploitationImpact::Low {
                    most_relevant = Some(asset);
                    if Rating::of_asset(asset, model).is_high() {
                        impact = RiskExploitationImpact::Medium;
                    }
                }
                if Rating::own(asset).is_high() {
                    impact = RiskExploitationImpact::Medium;
                }
                if most_relevant.map_or(true, |current| asset.sensitivity_score() > current.sensitivity_score()) {
                    most_relevant = Some(asset);
                }
            }
            match asset.technology {
                Technology::BuildPipeline => pipeline = true,
                Technology::SourcecodeRepository => repository = true,
                Technology::DevOpsClient => devops_client = true,
                _ => {}
            }
        }

        let Some(asset) = most_relevant else {
            return Ok(Vec::new());
        };
        if pipeline && repository && devops_client {
            return Ok(Vec::new());
        }
        Ok(vec![Risk::new(
            INFO.id,
            RiskExploitationLikelihood::Unlikely,
            impact,
            format!(
                "Missing Build Infrastructure in the threat model (referencing asset {} as an example)",
                asset.title
            ),
        )
        .technical_asset(&asset.id)
        .breach(DataBreachProbability::Improbable, Vec::new())
        .identified_by(&[&asset.id])])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, ids, run, Fixture};
    use crate::types::Criticality;

    fn custom(id: &str) -> TechnicalAsset {
        let mut asset = asset(id, Technology::WebServiceRest);
        asset.custom_developed_parts = true;
        asset
    }

    #[test]
    fn references_most_sensitive_custom_asset() {
        let mut billing = custom("billing");
        billing.integrity = Criticality::Critical;
        let model = Fixture::new()
            .asset(custom("api"))
            .asset(billing)
            .asset(asset("ci", Technology::BuildPipeline))
            .build();
        let risks = run(&MissingBuildInfrastructure, model);
        assert_eq!(ids(&risks), vec!["missing-build-infrastructure@billing"]);
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Medium);
        assert!(risks[0].data_breach_technical_assets.is_empty());
    }

    #[test]
    fn complete_build_infrastructure() {
        let model = Fixture::new()
            .asset(custom("api"))
            .asset(asset("ci", Technology::BuildPipeline))
            .asset(asset("git", Technology::SourcecodeRepository))
            .asset(asset("laptop", Technology::DevOpsClient))
            .build();
        assert!(run(&MissingBuildInfrastructure, model).is_empty());
    }
}
