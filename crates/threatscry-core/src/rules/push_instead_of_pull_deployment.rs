use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
    Usage,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "push-instead-of-pull-deployment",
    title: "Push instead of Pull Deployment",
    description: "When comparing push-based vs. pull-based deployments from a security perspective, pull-based deployments improve the overall security of the deployment targets. Every exposed interface of a production system to accept a deployment increases the attack surface of the production system, thus a pull-based approach exposes less attack surface relevant interfaces.",
    impact: "If this risk is unmitigated, attackers might have more potential target vectors for attacks, as the overall attack surface is unnecessarily increased.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Build Pipeline Hardening",
    mitigation: "Try to prefer pull-based deployments (like GitOps scenarios offer) over push-based deployments to reduce the attack surface of the production system.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::Tampering,
    detection_logic: "Models with build pipeline components accessing in-scope targets of deployment (in a non-readonly way) which are not build-related components themselves.",
    risk_assessment: "The risk rating depends on the highest sensitivity of the deployment targets running custom-developed parts.",
    false_positives: "Communication links that are not deployment paths can be considered as false positives after individual review.",
    model_failure_possible_reason: true,
    cwe: 1127,
};

pub struct PushInsteadOfPullDeployment;

impl RiskRule for PushInsteadOfPullDeployment {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for pipeline in model
            .technical_assets
            .values()
            .filter(|asset| asset.technology == Technology::BuildPipeline)
        {
            for link in pipeline
                .communication_links
                .iter()
                .filter(|link| !link.readonly && link.usage == Usage::DevOps)
            {
                let Some(target) = model.technical_asset(&link.target_id) else {
                    continue;
                };
                if target.out_of_scope
                    || target.technology.is_development_relevant()
                    || target.usage != Usage::Business
                {
                    continue;
                }
                let impact = if Rating::of_asset(target, model).is_high() {
                    RiskExploitationImpact::Medium
                } else {
                    RiskExploitationImpact::Low
                };
                risks.push(
                    Risk::new(
                        INFO.id,
                        RiskExploitationLikelihood::Unlikely,
                        impact,
                        format!(
                            "Push instead of Pull Deployment at {} via build pipeline asset {}",
                            target.title, pipeline.title
                        ),
                    )
                    .technical_asset(&target.id)
                    .communication_link(&link.id)
                    .breach(DataBreachProbability::Improbable, vec![target.id.clone()])
                    .identified_by(&[&pipeline.id, &target.id]),
                );
            }
        }
        Ok(risks)
    }
}
