use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction,
    Stride,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "unnecessary-communication-link",
    title: "Unnecessary Communication Link",
    description: "When a technical communication link does not send or receive any data assets, this is an indicator for an unnecessary communication link (or for an incomplete model).",
    impact: "If this risk is unmitigated, attackers might be able to target unnecessary communication links.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Attack Surface Reduction",
    mitigation: "Try to avoid using technical communication links that do not send or receive anything.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope technical assets' technical communication links not sending or receiving any data assets.",
    risk_assessment: "low",
    false_positives: "Usually no false positives as this looks like an incomplete model.",
    model_failure_possible_reason: true,
    cwe: 1008,
};

pub struct UnnecessaryCommunicationLink;

impl RiskRule for UnnecessaryCommunicationLink {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model.technical_assets.values() {
            for link in asset.communication_links.iter().filter(|link| !link.sends_or_receives_data()) {
                let target_in_scope = model
                    .technical_asset(&link.target_id)
                    .is_some_and(|target| !target.out_of_scope);
                if asset.out_of_scope && !target_in_scope {
                    continue;
                }
                risks.push(
                    Risk::new(
                        INFO.id,
                        RiskExploitationLikelihood::Unlikely,
                        RiskExploitationImpact::Low,
                        format!(
                            "Unnecessary Communication Link titled {} at technical asset {}",
                            link.title, asset.title
                        ),
                    )
                    .technical_asset(&asset.id)
                    .communication_link(&link.id)
                    .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
                    .identified_by(&[&link.id, &asset.id]),
                );
            }
        }
        Ok(risks)
    }
}
