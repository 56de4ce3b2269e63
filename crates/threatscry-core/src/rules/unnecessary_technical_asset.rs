use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction,
    Stride,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "unnecessary-technical-asset",
    title: "Unnecessary Technical Asset",
    description: "When a technical asset does not process or store any data assets, this is an indicator for an unnecessary technical asset (or for an incomplete model). This is also the case if the asset has no communication links (either outgoing or incoming).",
    impact: "If this risk is unmitigated, attackers might be able to target unnecessary technical assets.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Attack Surface Reduction",
    mitigation: "Try to avoid using technical assets that do not process or store anything.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "Technical assets not processing or storing any data assets.",
    risk_assessment: "low",
    false_positives: "Usually no false positives as this looks like an incomplete model.",
    model_failure_possible_reason: true,
    cwe: 1008,
};

pub struct UnnecessaryTechnicalAsset;

impl RiskRule for UnnecessaryTechnicalAsset {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .technical_assets
            .values()
            .filter(|asset| {
                let holds_no_data = asset.data_assets_processed.is_empty() && asset.data_assets_stored.is_empty();
                let isolated =
                    asset.communication_links.is_empty() && model.incoming_links(&asset.id).is_empty();
                holds_no_data || isolated
            })
            .map(|asset| {
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Unlikely,
                    RiskExploitationImpact::Low,
                    format!("Unnecessary Technical Asset named {}", asset.title),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
                .identified_by(&[&asset.id])
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, ids, link, run, Fixture};
    use crate::technology::Technology;

    #[test]
    fn dataless_or_isolated_assets() {
        let mut app = asset("app", Technology::WebApplication);
        app.data_assets_processed = vec!["orders".to_string()];
        let mut db = asset("db", Technology::Database);
        db.data_assets_stored = vec!["orders".to_string()];
        let mut island = asset("island", Technology::Task);
        island.data_assets_processed = vec!["orders".to_string()];
        let model = Fixture::new()
            .asset(app)
            .asset(db)
            .asset(island)
            .asset(asset("proxy", Technology::ReverseProxy))
            .link(link("app", "Store", "db", Protocol::Jdbc))
            .link(link("proxy", "Forward", "app", Protocol::Https))
            .build();

        let risks = run(&UnnecessaryTechnicalAsset, model);
        assert_eq!(
            ids(&risks),
            vec!["unnecessary-technical-asset@island", "unnecessary-technical-asset@proxy"]
        );
    }
}
