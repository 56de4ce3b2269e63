use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, ParsedModel, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Confidentiality, DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride, Usage,
};

use super::{sorted_unique, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "server-side-request-forgery",
    title: "Server-Side Request Forgery (SSRF)",
    description: "When a server system (i.e. not a client) is accessing other server systems via typical web protocols Server-Side Request Forgery (SSRF) or Local-File-Inclusion (LFI) or Remote-File-Inclusion (RFI) risks might arise.",
    impact: "If this risk is unmitigated, attackers might be able to access sensitive services or files of network-reachable components by modifying outgoing calls of affected components.",
    asvs: "V12 - File and Resources Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Server_Side_Request_Forgery_Prevention_Cheat_Sheet.html",
    action: "SSRF Prevention",
    mitigation: "Try to avoid constructing the outgoing target URL with caller controllable values. Alternatively use a mapping (whitelist) when accessing outgoing URLs instead of creating them including caller controllable values. When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Development,
    stride: Stride::InformationDisclosure,
    detection_logic: "In-scope non-client systems accessing (using outgoing communication links) targets with either HTTP or HTTPS protocol.",
    risk_assessment: "The risk rating (low or medium) depends on the sensitivity of the data assets receivable via web protocols from targets within the same network trust-boundary as well on the sensitivity of the data assets receivable via web protocols from the target asset itself. Also for cloud-based environments the exploitation impact is at least medium, as cloud backend services can be attacked via SSRF.",
    false_positives: "Servers not sending outgoing web requests can be considered as false positives after review.",
    model_failure_possible_reason: false,
    cwe: 918,
};

pub struct ServerSideRequestForgery;

impl RiskRule for ServerSideRequestForgery {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model
            .in_scope_technical_assets()
            .filter(|asset| !asset.technology.is_client() && asset.technology != Technology::LoadBalancer)
        {
            for link in asset
                .communication_links
                .iter()
                .filter(|link| link.protocol.is_potential_web_access_protocol())
            {
                if let Some(target) = model.technical_asset(&link.target_id) {
                    risks.push(risk(model, asset, target, link));
                }
            }
        }
        Ok(risks)
    }
}

fn risk(model: &ParsedModel, asset: &TechnicalAsset, target: &TechnicalAsset, link: &CommunicationLink) -> Risk {
    let mut top_secret = target.highest_confidentiality(model) == Confidentiality::StrictlyConfidential;

    // Anything serving web requests in the same network can be reached through the requesting asset.
    let mut reachable = vec![asset.id.clone()];
    for candidate in model.technical_assets.values() {
        if !asset.is_same_trust_boundary_network_only(model, &candidate.id) {
            continue;
        }
        let serves_web = model
            .incoming_links(&candidate.id)
            .iter()
            .any(|incoming| incoming.protocol.is_potential_web_access_protocol());
        if serves_web {
            reachable.push(candidate.id.clone());
            top_secret |= candidate.highest_confidentiality(model) == Confidentiality::StrictlyConfidential;
        }
    }
    let in_cloud = model
        .direct_trust_boundary(&asset.id)
        .map_or(false, |boundary| boundary.kind.is_within_cloud());
    let impact = if top_secret || in_cloud {
        RiskExploitationImpact::Medium
    } else {
        RiskExploitationImpact::Low
    };
    let likelihood = if link.usage == Usage::DevOps {
        RiskExploitationLikelihood::Unlikely
    } else {
        RiskExploitationLikelihood::Likely
    };

    Risk::new(
        INFO.id,
        likelihood,
        impact,
        format!(
            "Server-Side Request Forgery (SSRF) risk at {} server-side web-requesting the target {} via {}",
            asset.title, target.title, link.title
        ),
    )
    .technical_asset(&asset.id)
    .communication_link(&link.id)
    .breach(DataBreachProbability::Possible, sorted_unique(reachable))
    .identified_by(&[&asset.id, &target.id, &link.id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, boundary, ids, link, run, Fixture};
    use crate::types::TrustBoundaryType;

    #[test]
    fn requests_expose_web_neighbours() {
        let mut hr = asset("hr", Technology::WebServiceRest);
        hr.confidentiality = Confidentiality::StrictlyConfidential;
        let model = Fixture::new()
            .asset(asset("browser", Technology::Browser))
            .asset(asset("app", Technology::WebApplication))
            .asset(asset("geo", Technology::WebServiceRest))
            .asset(hr)
            .link(link("browser", "Web", "app", Protocol::Https))
            .link(link("app", "Lookup", "geo", Protocol::Https))
            .link(link("geo", "Salaries", "hr", Protocol::Https))
            .boundary(boundary("lan", TrustBoundaryType::NetworkOnPrem, &["app", "geo", "hr"]))
            .build();

        let risks = run(&ServerSideRequestForgery, model);
        assert_eq!(
            ids(&risks),
            vec![
                "server-side-request-forgery@app@geo@app>lookup",
                "server-side-request-forgery@geo@hr@geo>salaries",
            ]
        );
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Medium);
        assert_eq!(risks[0].data_breach_technical_assets, vec!["app", "geo", "hr"]);
    }

    #[test]
    fn cloud_boundary_raises_impact() {
        let model = Fixture::new()
            .asset(asset("fn", Technology::Function))
            .asset(asset("api", Technology::WebServiceRest))
            .link(link("fn", "Call", "api", Protocol::Https))
            .boundary(boundary("vpc", TrustBoundaryType::NetworkCloudProvider, &["fn"]))
            .build();
        let risks = run(&ServerSideRequestForgery, model);
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Medium);
    }
}
