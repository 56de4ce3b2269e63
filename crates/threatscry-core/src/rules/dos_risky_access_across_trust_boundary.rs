use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, ParsedModel, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Criticality, DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride, Usage,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "dos-risky-access-across-trust-boundary",
    title: "DoS-risky Access Across Trust-Boundary",
    description: "Assets accessed across trust boundaries with critical or mission-critical availability rating are more prone to Denial-of-Service (DoS) risks.",
    impact: "If this risk remains unmitigated, attackers might be able to disturb the availability of important parts of the system.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Denial_of_Service_Cheat_Sheet.html",
    action: "Anti-DoS Measures",
    mitigation: "Apply anti-DoS techniques like throttling and/or per-client load blocking with quotas. Also for maintenance access routes consider applying a VPN instead of public reachable interfaces. Generally applying redundancy on the targeted technical asset reduces the risk of DoS.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::DenialOfService,
    detection_logic: "In-scope technical assets (excluding load-balancer) with availability rating of critical or higher which have incoming data-flows across a network trust-boundary (excluding devops usage).",
    risk_assessment: "Matching technical assets with availability rating of critical or higher are at low risk. When the availability rating is mission-critical and neither a VPN nor IP filter for the incoming data-flow nor redundancy for the asset is applied, the risk-rating is considered medium.",
    false_positives: "When the accessed target operations are not time- or resource-consuming.",
    model_failure_possible_reason: false,
    cwe: 400,
};

pub struct DosRiskyAccessAcrossTrustBoundary;

impl RiskRule for DosRiskyAccessAcrossTrustBoundary {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model.in_scope_technical_assets().filter(|asset| {
            asset.technology != Technology::LoadBalancer && asset.availability >= Criticality::Critical
        }) {
            for link in model.incoming_links(&asset.id) {
                let Some(source) = model.technical_asset(&link.source_id) else {
                    continue;
                };
                if source.technology.is_traffic_forwarding() {
                    // Walk one hop up to the callers of the forwarder.
                    for forwarded in model.incoming_links(&source.id) {
                        risks.extend(check(model, asset, forwarded, Some(&source.title)));
                    }
                } else {
                    risks.extend(check(model, asset, link, None));
                }
            }
        }
        Ok(risks)
    }
}

fn check(
    model: &ParsedModel,
    asset: &TechnicalAsset,
    link: &CommunicationLink,
    hop: Option<&str>,
) -> Option<Risk> {
    if !link.is_across_trust_boundary_network_only(model)
        || link.protocol.is_process_local()
        || link.usage == Usage::DevOps
    {
        return None;
    }
    let client = model.technical_asset(&link.source_id)?;
    let impact = if asset.availability == Criticality::MissionCritical
        && !link.vpn
        && !link.ip_filtered
        && !asset.redundant
    {
        RiskExploitationImpact::Medium
    } else {
        RiskExploitationImpact::Low
    };
    let mut title = format!(
        "Denial-of-Service risky access of {} by {} via {}",
        asset.title, client.title, link.title
    );
    if let Some(hop) = hop {
        title.push_str(&format!(" forwarded via {hop}"));
    }
    Some(
        Risk::new(INFO.id, RiskExploitationLikelihood::Unlikely, impact, title)
            .technical_asset(&asset.id)
            .communication_link(&link.id)
            .breach(DataBreachProbability::Improbable, Vec::new())
            .identified_by(&[&asset.id, &client.id, &link.id]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, boundary, ids, link, run, Fixture};
    use crate::types::TrustBoundaryType;

    #[test]
    fn forwarded_access_names_the_original_caller() {
        let mut api = asset("api", Technology::WebServiceRest);
        api.availability = Criticality::MissionCritical;
        let model = Fixture::new()
            .asset(api)
            .asset(asset("lb", Technology::LoadBalancer))
            .asset(asset("client", Technology::Browser))
            .link(link("client", "Call", "lb", Protocol::Https))
            .link(link("lb", "Forward", "api", Protocol::Https))
            .boundary(boundary("inner", TrustBoundaryType::NetworkCloudSecurityGroup, &["api", "lb"]))
            .build();

        let risks = run(&DosRiskyAccessAcrossTrustBoundary, model);
        assert_eq!(
            ids(&risks),
            vec!["dos-risky-access-across-trust-boundary@api@client@client>call"]
        );
        assert_eq!(
            risks[0].title,
            "Denial-of-Service risky access of api by client via Call forwarded via lb"
        );
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Medium);
        assert!(risks[0].data_breach_technical_assets.is_empty());
    }

    #[test]
    fn same_boundary_access_is_not_risky() {
        let mut api = asset("api", Technology::WebServiceRest);
        api.availability = Criticality::Critical;
        let model = Fixture::new()
            .asset(api)
            .asset(asset("app", Technology::WebApplication))
            .link(link("app", "Call", "api", Protocol::Https))
            .boundary(boundary("net", TrustBoundaryType::NetworkOnPrem, &["api", "app"]))
            .build();
        assert!(run(&DosRiskyAccessAcrossTrustBoundary, model).is_empty());
    }
}
