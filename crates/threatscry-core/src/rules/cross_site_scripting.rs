use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "cross-site-scripting",
    title: "Cross-Site Scripting (XSS)",
    description: "For each web application Cross-Site Scripting (XSS) risks might arise. In terms of the overall risk level take other applications running on the same domain into account as well.",
    impact: "If this risk remains unmitigated, attackers might be able to access individual victim sessions and steal or modify user data.",
    asvs: "V5 - Validation, Sanitization and Encoding Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Cross_Site_Scripting_Prevention_Cheat_Sheet.html",
    action: "XSS Prevention",
    mitigation: "Try to encode all values sent back to the browser and also handle DOM-manipulations in a safe way to avoid DOM-based XSS. When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Development,
    stride: Stride::Tampering,
    detection_logic: "In-scope web applications.",
    risk_assessment: "The risk rating depends on the sensitivity of the data processed or stored in the web application.",
    false_positives: "When the technical asset is not accessed via a browser-like component (i.e not by a human user initiating the request that gets passed through all components until it reaches the web application) this can be considered a false positive.",
    model_failure_possible_reason: false,
    cwe: 79,
};

pub struct CrossSiteScripting;

impl RiskRule for CrossSiteScripting {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .in_scope_technical_assets()
            .filter(|asset| asset.technology.is_web_application())
            .map(|asset| {
                let impact = if asset.highest_confidentiality(model) == Confidentiality::StrictlyConfidential
                    || asset.highest_integrity(model) == Criticality::MissionCritical
                {
                    RiskExploitationImpact::High
                } else {
                    RiskExploitationImpact::Medium
                };
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Likely,
                    impact,
                    format!("Cross-Site Scripting (XSS) risk at {}", asset.title),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Possible, vec![asset.id.clone()])
                .identified_by(&[&asset.id])
            })
            .collect())
    }
}
