use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-waf",
    title: "Missing Web Application Firewall (WAF)",
    description: "To have a first line of filtering defense, security architectures with web-services or web-applications should include a WAF in front of them. Even though a WAF is not a replacement for security (all components must be secure even without a WAF) it adds another layer of defense to the overall system by delaying some attacks and having easier attack alerting through it.",
    impact: "If this risk is unmitigated, attackers might be able to apply standard attack pattern tests at great speed without any filtering.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Virtual_Patching_Cheat_Sheet.html",
    action: "Web Application Firewall (WAF)",
    mitigation: "Consider placing a Web Application Firewall (WAF) in front of the web-services and/or web-applications. For cloud environments many cloud providers offer pre-configured WAFs. Even reverse proxies can be enhances by a WAF component via ModSecurity plugins.",
    check: "Is a Web Application Firewall (WAF) in place?",
    function: RiskFunction::Operations,
    stride: Stride::Tampering,
    detection_logic: "In-scope web-services and/or web-applications accessed across a network trust boundary not having a Web Application Firewall (WAF) in front of them.",
    risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
    false_positives: "Targets only accessible via WAFs or reverse proxies containing a WAF component (like ModSecurity) can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 1008,
};

pub struct MissingWaf;

impl RiskRule for MissingWaf {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model
            .in_scope_technical_assets()
            .filter(|asset| asset.technology.is_web_application() || asset.technology.is_web_service())
        {
            let unfiltered = model.incoming_links(&asset.id).iter().any(|link| {
                link.is_across_trust_boundary_network_only(model)
                    && link.protocol.is_potential_web_access_protocol()
                    && model
                        .technical_asset(&link.source_id)
                        .map_or(false, |source| source.technology != Technology::Waf)
            });
            if !unfiltered {
                continue;
            }
            let impact = if Rating::of_asset(asset, model).is_top() {
                RiskExploitationImpact::Medium
            } else {
                RiskExploitationImpact::Low
            };
            risks.push(
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Unlikely,
                    impact,
                    format!("Missing Web Application Firewall (WAF) risk at {}", asset.title),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
                .identified_by(&[&asset.id]),
            );
        }
        Ok(risks)
    }
}
