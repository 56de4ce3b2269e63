use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::protocol::Protocol;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction,
    Stride,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "incomplete-model",
    title: "Incomplete Model",
    description: "When the threat model contains unknown technologies or transfers data over unknown protocols, this is an indicator for an incomplete model.",
    impact: "If this risk is unmitigated, other risks might not be noticed as the model is incomplete.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Threat_Modeling_Cheat_Sheet.html",
    action: "Threat Modeling Completeness",
    mitigation: "Try to find out what technology or protocol is used instead of specifying that it is unknown.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::InformationDisclosure,
    detection_logic: "All technical assets and communication links with technology type or protocol type specified as unknown.",
    risk_assessment: "low",
    false_positives: "Usually no false positives as this looks like an incomplete model.",
    model_failure_possible_reason: true,
    cwe: 1008,
};

pub struct IncompleteModel;

impl RiskRule for IncompleteModel {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let mut risks = Vec::new();
        for asset in ctx.model().in_scope_technical_assets() {
            if asset.technology == Technology::UnknownTechnology {
                risks.push(
                    low_risk(format!(
                        "Unknown Technology specified at technical asset {}",
                        asset.title
                    ))
                    .technical_asset(&asset.id)
                    .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
                    .identified_by(&[&asset.id]),
                );
            }
            for link in asset
                .communication_links
                .iter()
                .filter(|link| link.protocol == Protocol::UnknownProtocol)
            {
                risks.push(
                    low_risk(format!(
                        "Unknown Protocol specified for communication link {} at technical asset {}",
                        link.title, asset.title
                    ))
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

fn low_risk(title: String) -> Risk {
    Risk::new(
        INFO.id,
        RiskExploitationLikelihood::Unlikely,
        RiskExploitationImpact::Low,
        title,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, ids, link, run, Fixture};

    #[test]
    fn unknown_technology_and_protocol_are_reported() {
        let mut ghost = asset("ghost", Technology::UnknownTechnology);
        ghost.out_of_scope = true;
        let model = Fixture::new()
            .asset(asset("mystery", Technology::UnknownTechnology))
            .asset(asset("app", Technology::WebApplication))
            .asset(ghost)
            .link(link("app", "Something", "mystery", Protocol::UnknownProtocol))
            .build();
        let risks = run(&IncompleteModel, model);
        assert_eq!(
            ids(&risks),
            vec![
                "incomplete-model@app>something@app",
                "incomplete-model@mystery"
            ]
        );
        assert!(risks.iter().all(|risk| risk.severity == crate::types::RiskSeverity::Low));
    }
}
