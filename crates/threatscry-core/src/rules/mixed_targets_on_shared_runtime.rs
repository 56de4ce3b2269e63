use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{ParsedModel, SharedRuntime};
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "mixed-targets-on-shared-runtime",
    title: "Mixed Targets on Shared Runtime",
    description: "Different attacker targets (like frontend and backend/datastore components) should not be running on the same shared (underlying) runtime.",
    impact: "If this risk is unmitigated, attackers successfully attacking other components of the system might have an easy path towards more valuable targets, as they are running on the same shared runtime.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Runtime Separation",
    mitigation: "Use separate runtime environments for running different target components or apply similar separation styles to prevent load- or breach-related problems originating from one more attacker-facing asset impacts also the other more critical rated backend/datastore assets.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "Shared runtime running technical assets of different trust-boundaries is at risk. Also mixing backend/datastore with frontend components on the same shared runtime is considered a risk.",
    risk_assessment: "The risk rating (low or medium) depends on the confidentiality, integrity, and availability rating of the technical asset running on the shared runtime.",
    false_positives: "When all assets running on the shared runtime are hardened and protected to the same extend as if all were containing/processing highly sensitive data.",
    model_failure_possible_reason: false,
    cwe: 1008,
};

pub struct MixedTargetsOnSharedRuntime;

impl RiskRule for MixedTargetsOnSharedRuntime {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .shared_runtimes
            .values()
            .filter(|runtime| is_mixed(model, runtime))
            .map(|runtime| {
                let impact = if runtime
                    .technical_assets_running
                    .iter()
                    .filter_map(|id| model.technical_asset(id))
                    .any(|asset| Rating::own(asset).is_top())
                {
                    RiskExploitationImpact::Medium
                } else {
                    RiskExploitationImpact::Low
                };
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Unlikely,
                    impact,
                    format!(
                        "Mixed Targets on Shared Runtime named {} might enable attackers moving from one less \
                         valuable target to a more valuable one",
                        runtime.title
                    ),
                )
                .shared_runtime(&runtime.id)
                .breach(DataBreachProbability::Improbable, runtime.technical_assets_running.clone())
                .identified_by(&[&runtime.id])
            })
            .collect())
    }
}

/// Assets from different trust boundaries, or frontend next to backend.
fn is_mixed(model: &ParsedModel, runtime: &SharedRuntime) -> bool {
    let mut current_boundary = "";
    let (mut frontend, mut backend) = (false, false);
    for asset in runtime
        .technical_assets_running
        .iter()
        .filter_map(|id| model.technical_asset(id))
    {
        let boundary = model
            .direct_trust_boundary(&asset.id)
            .map_or("", |boundary| boundary.id.as_str());
        // An asset outside any boundary does not start a comparison.
        if !current_boundary.is_empty() && current_boundary != boundary {
            return true;
        }
        current_boundary = boundary;
        frontend |= asset.technology.is_exclusively_frontend_related();
        backend |= asset.technology.is_exclusively_backend_related();
    }
    frontend && backend
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, boundary, ids, run, runtime, Fixture};
    use crate::technology::Technology;
    use crate::types::TrustBoundaryType;

    #[test]
    fn frontend_and_backend_on_one_host() {
        let model = Fixture::new()
            .asset(asset("proxy", Technology::ReverseProxy))
            .asset(asset("db", Technology::Database))
            .asset(asset("app", Technology::WebApplication))
            .runtime(runtime("host1", &["proxy", "db"]))
            .runtime(runtime("host2", &["app", "db"]))
            .build();
        let risks = run(&MixedTargetsOnSharedRuntime, model);
        assert_eq!(ids(&risks), vec!["mixed-targets-on-shared-runtime@host1"]);
        assert_eq!(risks[0].data_breach_technical_assets, vec!["proxy", "db"]);
    }

    #[test]
    fn assets_from_different_boundaries() {
        let model = Fixture::new()
            .asset(asset("a", Technology::WebApplication))
            .asset(asset("b", Technology::WebApplication))
            .boundary(boundary("zone-a", TrustBoundaryType::NetworkVirtualLan, &["a"]))
            .boundary(boundary("zone-b", TrustBoundaryType::NetworkVirtualLan, &["b"]))
            .runtime(runtime("vm", &["a", "b"]))
            .build();
        assert_eq!(
            ids(&run(&MixedTargetsOnSharedRuntime, model)),
            vec!["mixed-targets-on-shared-runtime@vm"]
        );
    }
}
