use std::collections::BTreeSet;

use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction,
    Stride,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "unnecessary-data-asset",
    title: "Unnecessary Data Asset",
    description: "When a data asset is not processed or stored by any data assets and also not transferred by any communication links, this is an indicator for an unnecessary data asset (or for an incomplete model).",
    impact: "If this risk is unmitigated, attackers might be able to access unnecessary data assets using other vulnerabilities.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Attack Surface Reduction",
    mitigation: "Try to avoid having data assets that are not required/used.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "Modelled data assets not processed or stored by any data assets and also not transferred by any communication links.",
    risk_assessment: "low",
    false_positives: "Usually no false positives as this looks like an incomplete model.",
    model_failure_possible_reason: true,
    cwe: 1008,
};

pub struct UnnecessaryDataAsset;

impl RiskRule for UnnecessaryDataAsset {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut used: BTreeSet<&str> = BTreeSet::new();
        for asset in model.technical_assets.values() {
            used.extend(asset.data_assets_processed.iter().map(String::as_str));
            used.extend(asset.data_assets_stored.iter().map(String::as_str));
            for link in &asset.communication_links {
                used.extend(link.data_assets_sent.iter().map(String::as_str));
                used.extend(link.data_assets_received.iter().map(String::as_str));
            }
        }
        Ok(model
            .data_assets
            .values()
            .filter(|data| !used.contains(data.id.as_str()))
            .map(|data| {
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Unlikely,
                    RiskExploitationImpact::Low,
                    format!("Unnecessary Data Asset named {}", data.title),
                )
                .data_asset(&data.id)
                .breach(DataBreachProbability::Improbable, Vec::new())
                .identified_by(&[&data.id])
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, data, ids, link, run, Fixture};
    use crate::technology::Technology;
    use crate::types::{Confidentiality, Criticality};

    #[test]
    fn only_unreferenced_data_is_reported() {
        let mut app = asset("app", Technology::WebApplication);
        app.data_assets_stored = vec!["sessions".to_string()];
        let mut fetch = link("app", "Fetch", "api", Protocol::Https);
        fetch.data_assets_received = vec!["prices".to_string()];
        let model = Fixture::new()
            .data(data("sessions", Confidentiality::Internal, Criticality::Operational))
            .data(data("prices", Confidentiality::Public, Criticality::Operational))
            .data(data("legacy-export", Confidentiality::Confidential, Criticality::Operational))
            .asset(app)
            .asset(asset("api", Technology::WebServiceRest))
            .link(fetch)
            .build();

        let risks = run(&UnnecessaryDataAsset, model);
        assert_eq!(ids(&risks), vec!["unnecessary-data-asset@legacy-export"]);
        assert_eq!(risks[0].most_relevant_data_asset.as_deref(), Some("legacy-export"));
        assert!(risks[0].data_breach_technical_assets.is_empty());
    }
}
