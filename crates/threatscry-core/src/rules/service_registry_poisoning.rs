use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "service-registry-poisoning",
    title: "Service Registry Poisoning",
    description: "When a service registry used for discovery of trusted service endpoints Service Registry Poisoning risks might arise.",
    impact: "If this risk remains unmitigated, attackers might be able to poison the service registry with malicious service endpoints or malicious lookup and config data leading to breach of sensitive data.",
    asvs: "V10 - Malicious Code Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Access_Control_Cheat_Sheet.html",
    action: "Service Registry Integrity Check",
    mitigation: "Try to strengthen the access control of the service registry and apply cross-checks to detect maliciously poisoned lookup data.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::Spoofing,
    detection_logic: "In-scope service registries.",
    risk_assessment: "The risk rating depends on the sensitivity of the technical assets accessing the service registry as well as the data assets processed or stored.",
    false_positives: "Service registries not used for service discovery can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 693,
};

pub struct ServiceRegistryPoisoning;

impl RiskRule for ServiceRegistryPoisoning {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for registry in model
            .in_scope_technical_assets()
            .filter(|asset| asset.technology == Technology::ServiceRegistry)
        {
            let registry_top = Rating::of_asset(registry, model).is_top();
            let sensitive_lookup = model.incoming_links(&registry.id).iter().any(|link| {
                registry_top
                    || Rating::of_link(link, model).is_top()
                    || model
                        .technical_asset(&link.source_id)
                        .map_or(false, |caller| Rating::of_asset(caller, model).is_top())
            });
            let impact = if sensitive_lookup {
                RiskExploitationImpact::Medium
            } else {
                RiskExploitationImpact::Low
            };
            risks.push(
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Unlikely,
                    impact,
                    format!("Service Registry Poisoning risk at {}", registry.title),
                )
                .technical_asset(&registry.id)
                .breach(DataBreachProbability::Improbable, vec![registry.id.clone()])
                .identified_by(&[&registry.id]),
            );
        }
        Ok(risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, ids, link, run, Fixture};
    use crate::types::Criticality;

    #[test]
    fn mission_critical_caller_raises_impact() {
        let mut payments = asset("payments", Technology::WebServiceRest);
        payments.integrity = Criticality::MissionCritical;
        let model = Fixture::new()
            .asset(asset("eureka", Technology::ServiceRegistry))
            .asset(payments)
            .link(link("payments", "Lookup", "eureka", Protocol::Https))
            .build();
        let risks = run(&ServiceRegistryPoisoning, model);
        assert_eq!(ids(&risks), vec!["service-registry-poisoning@eureka"]);
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Medium);
    }

    #[test]
    fn unused_registry_is_low() {
        let mut registry = asset("eureka", Technology::ServiceRegistry);
        registry.integrity = Criticality::MissionCritical;
        let risks = run(&ServiceRegistryPoisoning, Fixture::new().asset(registry).build());
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Low);
    }
}
