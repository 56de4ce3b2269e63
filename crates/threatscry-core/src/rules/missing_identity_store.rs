use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::TechnicalAsset;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    Authorization, DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-identity-store",
    title: "Missing Identity Store",
    description: "The modeled architecture does not contain an identity store, which might be the risk of a model missing critical assets (and thus not seeing their risks).",
    impact: "If this risk is unmitigated, attackers might be able to exploit risks unseen in this threat model in the identity provider/store that is currently missing in the model.",
    asvs: "V2 - Authentication Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Authentication_Cheat_Sheet.html",
    action: "Identity Store",
    mitigation: "Include an identity store in the model if the application has a login.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::Spoofing,
    detection_logic: "Models with authenticated data-flows authorized via enduser-identity missing an in-scope identity store.",
    risk_assessment: "The risk rating depends on the sensitivity of the enduser-identity authorized technical assets and their data assets processed and stored.",
    false_positives: "Models only offering data/services without any real authentication need can be considered as false positives after individual review.",
    model_failure_possible_reason: true,
    cwe: 287,
};

pub struct MissingIdentityStore;

impl RiskRule for MissingIdentityStore {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        if model
            .in_scope_technical_assets()
            .any(|asset| asset.technology.is_identity_store())
        {
            return Ok(Vec::new());
        }

        let mut impact = RiskExploitationImpact::Low;
        let mut most_relevant: Option<&TechnicalAsset> = None;
        for asset in model.technical_assets.values() {
            for link in asset
                .communication_links
                .iter()
                .filter(|link| link.authorization == Authorization::EnduserIdentityPropagation)
            {
                let Some(target) = model.technical_asset(&link.target_id) else {
                    continue;
                };
                if impact == RiskExploitationImpact::Low {
                    most_relevant = Some(target);
                    if Rating::of_asset(target, model).is_high() {
                        impact = RiskExploitationImpact::Medium;
                    }
                }
                if Rating::own(target).is_high() {
                    impact = RiskExploitationImpact::Medium;
                }
                if most_relevant.map_or(true, |current| asset.sensitivity_score() > current.sensitivity_score()) {
                    most_relevant = Some(asset);
                }
            }
        }

        Ok(most_relevant
            .map(|asset| {
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Unlikely,
                    impact,
                    format!(
                        "Missing Identity Store in the threat model (referencing asset {} as an example)",
                        asset.title
                    ),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Improbable, Vec::new())
                .identified_by(&[&asset.id])
            })
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, ids, link, run, Fixture};
    use crate::technology::Technology;
    use crate::types::Confidentiality;

    fn model_with(extra: Option<TechnicalAsset>) -> crate::model::ParsedModel {
        let mut api = asset("api", Technology::WebServiceRest);
        api.confidentiality = Confidentiality::Confidential;
        let mut call = link("web", "Call", "api", Protocol::Https);
        call.authorization = Authorization::EnduserIdentityPropagation;
        let mut fixture = Fixture::new()
            .asset(api)
            .asset(asset("web", Technology::WebApplication))
            .link(call);
        if let Some(extra) = extra {
            fixture = fixture.asset(extra);
        }
        fixture.build()
    }

    #[test]
    fn identity_propagation_without_store() {
        let risks = run(&MissingIdentityStore, model_with(None));
        assert_eq!(ids(&risks), vec!["missing-identity-store@api"]);
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Medium);
    }

    #[test]
    fn in_scope_identity_store_present() {
        let store = asset("users", Technology::IdentityStoreDatabase);
        assert!(run(&MissingIdentityStore, model_with(Some(store))).is_empty());
    }
}
