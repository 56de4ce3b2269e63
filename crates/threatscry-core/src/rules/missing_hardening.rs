use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::TechnicalAsset;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride, TechnicalAssetType,
};

use super::{tags, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-hardening",
    title: "Missing Hardening",
    description: "Technical assets with a Relative Attacker Attractiveness (RAA) value of 55 % or higher should be explicitly hardened taking best practices and vendor hardening guides into account.",
    impact: "If this risk remains unmitigated, attackers might be able to easier attack high-value targets.",
    asvs: "V14 - Configuration Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "System Hardening",
    mitigation: "Try to apply all hardening best practices (like CIS benchmarks, OWASP recommendations, vendor recommendations, DevSec Hardening Framework, DBSAT for Oracle databases, and others).",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::Tampering,
    detection_logic: "In-scope technical assets with RAA values of 55 % or higher. Generally for high-value targets like datastores, application servers, identity providers and ERP systems this limit is reduced to 40 %",
    risk_assessment: "The risk rating depends on the sensitivity of the data processed or stored in the technical asset.",
    false_positives: "Usually no false positives.",
    model_failure_possible_reason: false,
    cwe: 16,
};

const RAA_LIMIT: f64 = 55.0;
const RAA_LIMIT_REDUCED: f64 = 40.0;

pub struct MissingHardening;

impl RiskRule for MissingHardening {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn supported_tags(&self) -> Vec<String> {
        tags(&["tomcat"])
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .in_scope_technical_assets()
            .filter(|asset| is_attractive(asset))
            .map(|asset| {
                let impact = if asset.highest_confidentiality(model) == Confidentiality::StrictlyConfidential
                    || asset.highest_integrity(model) == Criticality::MissionCritical
                {
                    RiskExploitationImpact::Medium
                } else {
                    RiskExploitationImpact::Low
                };
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Likely,
                    impact,
                    format!("Missing Hardening risk at {}", asset.title),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
                .identified_by(&[&asset.id])
            })
            .collect())
    }
}

/// Attractive targets, with a lower bar for datastores and server-like assets.
fn is_attractive(asset: &TechnicalAsset) -> bool {
    asset.raa >= RAA_LIMIT
        || (asset.raa >= RAA_LIMIT_REDUCED
            && (asset.kind == TechnicalAssetType::Datastore
                || matches!(
                    asset.technology,
                    Technology::ApplicationServer | Technology::IdentityProvider | Technology::Erp
                )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, ids, run, Fixture};

    #[test]
    fn raa_thresholds() {
        let mut web = asset("web", Technology::WebApplication);
        web.raa = 50.0;
        let mut erp = asset("erp", Technology::Erp);
        erp.raa = 45.0;
        let mut api = asset("api", Technology::WebServiceRest);
        api.raa = 70.0;
        let model = Fixture::new().asset(web).asset(erp).asset(api).build();

        let risks = run(&MissingHardening, model);
        assert_eq!(ids(&risks), vec!["missing-hardening@api", "missing-hardening@erp"]);
    }
}
