use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::{exposure, Exposure, Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-identity-provider-isolation",
    title: "Missing Identity Provider Isolation",
    description: "Highly sensitive identity provider assets and their identity datastores should be isolated from other assets by their own network segmentation trust-boundary (execution-environment boundaries do not count as network isolation).",
    impact: "If this risk is unmitigated, attackers successfully attacking other components of the system might have an easy path towards highly sensitive identity provider assets and their identity datastores, as they are not separated by network segmentation.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Network Segmentation",
    mitigation: "Apply a network segmentation trust-boundary around the highly sensitive identity provider assets and their identity datastores.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope identity provider assets and their identity datastores when surrounded by other (not identity-related) assets (without a network trust-boundary in-between). This risk is especially prevalent when other non-identity related assets are within the same execution environment (i.e. same database or same application server).",
    risk_assessment: "Default is high impact. The impact is increased to very-high when the asset missing the trust-boundary protection is rated as strictly-confidential or mission-critical.",
    false_positives: "When all assets within the network segmentation trust-boundary are hardened and protected to the same extend as if all were identity providers with data of highest sensitivity.",
    model_failure_possible_reason: false,
    cwe: 1008,
};

pub struct MissingIdentityProviderIsolation;

impl RiskRule for MissingIdentityProviderIsolation {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model
            .in_scope_technical_assets()
            .filter(|asset| asset.technology.is_identity_related())
        {
            let Some(exposure) = exposure(model, asset, |other| {
                !other.technology.is_identity_related()
                    && !other.technology.is_close_to_high_value_targets_tolerated()
            }) else {
                continue;
            };
            let impact = if Rating::own(asset).is_top() {
                RiskExploitationImpact::VeryHigh
            } else {
                RiskExploitationImpact::High
            };
            let likelihood = match exposure {
                Exposure::ExecutionEnvironment => RiskExploitationLikelihood::Likely,
                Exposure::NetworkSegment => RiskExploitationLikelihood::Unlikely,
            };
            risks.push(
                Risk::new(
                    INFO.id,
                    likelihood,
                    impact,
                    format!(
                        "Missing Identity Provider Isolation to further encapsulate and protect identity-related asset {} \
                         against unrelated lower protected assets {}, which might be easier to compromise by attackers",
                        asset.title,
                        exposure.describe()
                    ),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
                .identified_by(&[&asset.id]),
            );
        }
        Ok(risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, boundary, ids, run, Fixture};
    use crate::technology::Technology;
    use crate::types::TrustBoundaryType;

    #[test]
    fn shared_execution_environment_is_likely() {
        let model = Fixture::new()
            .asset(asset("idp", Technology::IdentityProvider))
            .asset(asset("users", Technology::IdentityStoreLdap))
            .asset(asset("app", Technology::WebApplication))
            .asset(asset("lb", Technology::LoadBalancer))
            .boundary(boundary("host", TrustBoundaryType::ExecutionEnvironment, &["idp", "app"]))
            .build();

        let risks = run(&MissingIdentityProviderIsolation, model);
        assert_eq!(
            ids(&risks),
            vec![
                "missing-identity-provider-isolation@idp",
                "missing-identity-provider-isolation@users",
            ]
        );
        assert_eq!(risks[0].exploitation_likelihood, RiskExploitationLikelihood::Likely);
        assert!(risks[0].title.contains("in the same execution environment"));
        assert_eq!(risks[1].exploitation_likelihood, RiskExploitationLikelihood::Unlikely);
    }

    #[test]
    fn separate_network_is_isolated() {
        let model = Fixture::new()
            .asset(asset("idp", Technology::IdentityProvider))
            .asset(asset("app", Technology::WebApplication))
            .boundary(boundary("iam", TrustBoundaryType::NetworkVirtualLan, &["idp"]))
            .boundary(boundary("dmz", TrustBoundaryType::NetworkVirtualLan, &["app"]))
            .build();
        assert!(run(&MissingIdentityProviderIsolation, model).is_empty());
    }
}
