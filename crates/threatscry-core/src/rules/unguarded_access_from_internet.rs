use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, TechnicalAsset};
use crate::protocol::Protocol;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "unguarded-access-from-internet",
    title: "Unguarded Access From Internet",
    description: "Internet-exposed assets must be guarded by a protecting service, application, or reverse-proxy.",
    impact: "If this risk is unmitigated, attackers might be able to directly attack sensitive systems without any hardening components in-between due to them being directly exposed on the internet.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Encapsulation of Technical Asset",
    mitigation: "Encapsulate the asset behind a guarding service, application, or reverse-proxy. For admin maintenance a bastion-host should be used as a jump-server. For file transfer a store-and-forward-host should be used as an indirect file exchange platform.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope technical assets (excluding load-balancer) with confidentiality rating of confidential (or higher) or with integrity rating of critical (or higher) when accessed directly from the internet. All web-server, web-application, reverse-proxy, waf, and gateway assets are exempted from this risk when they do not consist of custom developed code and the data-flow only consists of HTTP or FTP protocols. Access from monitoring systems as well as VPN-protected connections are exempted.",
    risk_assessment: "The matching technical assets are at low risk. When either the confidentiality rating is strictly-confidential or the integrity rating is mission-critical, the risk-rating is considered medium. For assets with RAA values higher than 40 % the risk-rating increases.",
    false_positives: "When other means of filtering client requests are applied equivalent of reverse-proxy, waf, or gateway components.",
    model_failure_possible_reason: false,
    cwe: 501,
};

const RAA_LIMIT: f64 = 40.0;

pub struct UnguardedAccessFromInternet;

impl RiskRule for UnguardedAccessFromInternet {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model
            .in_scope_technical_assets()
            .filter(|asset| asset.technology != Technology::LoadBalancer)
            .filter(|asset| {
                asset.confidentiality >= Confidentiality::Confidential
                    || asset.integrity >= Criticality::Critical
            })
        {
            let mut incoming: Vec<&CommunicationLink> = model.incoming_links(&asset.id).iter().collect();
            incoming.sort_by(|a, b| a.id.cmp(&b.id));
            for link in incoming {
                if is_expected_entry_point(asset, link) || link.vpn {
                    continue;
                }
                let Some(source) = model.technical_asset(&link.source_id) else {
                    continue;
                };
                if source.technology == Technology::Monitoring || !source.internet {
                    continue;
                }
                let impact = if asset.confidentiality == Confidentiality::StrictlyConfidential
                    || asset.integrity == Criticality::MissionCritical
                    || asset.raa > RAA_LIMIT
                {
                    RiskExploitationImpact::Medium
                } else {
                    RiskExploitationImpact::Low
                };
                risks.push(
                    Risk::new(
                        INFO.id,
                        RiskExploitationLikelihood::VeryLikely,
                        impact,
                        format!(
                            "Unguarded Access from Internet of {} by {} via {}",
                            asset.title, source.title, link.title
                        ),
                    )
                    .technical_asset(&asset.id)
                    .communication_link(&link.id)
                    .breach(DataBreachProbability::Possible, vec![asset.id.clone()])
                    .identified_by(&[&asset.id, &source.id, &link.id]),
                );
            }
        }
        Ok(risks)
    }
}

/// Off-the-shelf web front doors and file gateways are meant to face the internet.
fn is_expected_entry_point(asset: &TechnicalAsset, link: &CommunicationLink) -> bool {
    if asset.custom_developed_parts {
        return false;
    }
    let web_front = matches!(
        asset.technology,
        Technology::WebServer
            | Technology::WebApplication
            | Technology::ReverseProxy
            | Technology::Waf
            | Technology::Gateway
    ) && matches!(link.protocol, Protocol::Http | Protocol::Https);
    let file_gateway = asset.technology == Technology::Gateway
        && matches!(link.protocol, Protocol::Ftp | Protocol::Ftps | Protocol::Sftp);
    web_front || file_gateway
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, ids, link, run, Fixture};

    fn internet_client(id: &str) -> TechnicalAsset {
        let mut client = asset(id, Technology::Browser);
        client.internet = true;
        client
    }

    #[test]
    fn custom_api_reached_from_internet() {
        let mut api = asset("api", Technology::WebServiceRest);
        api.confidentiality = Confidentiality::Confidential;
        api.raa = 45.0;
        let mut portal = asset("portal", Technology::WebServer);
        portal.confidentiality = Confidentiality::Confidential;
        let mut vpn = link("partner", "Sync", "api", Protocol::Https);
        vpn.vpn = true;
        let model = Fixture::new()
            .asset(api)
            .asset(portal)
            .asset(internet_client("browser"))
            .asset(internet_client("partner"))
            .link(link("browser", "Call", "api", Protocol::Https))
            .link(link("browser", "Visit", "portal", Protocol::Https))
            .link(vpn)
            .build();

        let risks = run(&UnguardedAccessFromInternet, model);
        assert_eq!(
            ids(&risks),
            vec!["unguarded-access-from-internet@api@browser@browser>call"]
        );
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Medium);
    }
}
