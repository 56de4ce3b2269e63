use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    DataBreachProbability, Machine, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride, TrustBoundaryType,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "wrong-trust-boundary-content",
    title: "Wrong Trust Boundary Content",
    description: "When a trust boundary of type network-policy-namespace-isolation contains non-container assets it is likely to be a model failure.",
    impact: "If this potential model error is not fixed, some risks might not be visible.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Threat_Modeling_Cheat_Sheet.html",
    action: "Model Consistency",
    mitigation: "Try to model the correct types of trust boundaries and data assets.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "Trust boundaries which should only contain containers, but have different assets inside.",
    risk_assessment: "low",
    false_positives: "Usually no false positives as this looks like an incomplete model.",
    model_failure_possible_reason: true,
    cwe: 1008,
};

pub struct WrongTrustBoundaryContent;

impl RiskRule for WrongTrustBoundaryContent {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for boundary in model
            .trust_boundaries
            .values()
            .filter(|boundary| boundary.kind == TrustBoundaryType::NetworkPolicyNamespaceIsolation)
        {
            for asset in boundary
                .technical_assets_inside
                .iter()
                .filter_map(|id| model.technical_asset(id))
                .filter(|asset| !matches!(asset.machine, Machine::Container | Machine::Serverless))
            {
                risks.push(
                    Risk::new(
                        INFO.id,
                        RiskExploitationLikelihood::Unlikely,
                        RiskExploitationImpact::Low,
                        format!(
                            "Wrong Trust Boundary Content (non-container asset inside container trust boundary) at {}",
                            asset.title
                        ),
                    )
                    .technical_asset(&asset.id)
                    .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
                    .identified_by(&[&asset.id]),
                );
            }
        }
        Ok(risks)
    }
}
