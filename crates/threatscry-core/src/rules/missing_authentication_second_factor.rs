use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, ParsedModel, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    Authentication, Confidentiality, Criticality, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::missing_authentication::{
    authentication_risk, is_authenticating_caller, needs_authentication, AccessPath,
};
use super::{push_unique, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-authentication-second-factor",
    title: "Missing Two-Factor Authentication (2FA)",
    description: "Technical assets (especially multi-tenant systems) should authenticate incoming requests with two-factor (2FA) authentication when the asset processes or stores highly sensitive data (in terms of confidentiality, integrity, and availability) and is accessed by humans.",
    impact: "If this risk is unmitigated, attackers might be able to access or modify highly sensitive data without strong authentication.",
    asvs: "V2 - Authentication Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Multifactor_Authentication_Cheat_Sheet.html",
    action: "Authentication with Second Factor (2FA)",
    mitigation: "Apply an authentication method to the technical asset protecting highly sensitive data via two-factor authentication for human users.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::BusinessSide,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope technical assets (except load-balancer, reverse-proxy, waf, ids, and ips) should authenticate incoming requests via two-factor authentication (2FA) when the asset processes or stores highly sensitive data (in terms of confidentiality, integrity, and availability) and is accessed by a client used by a human user.",
    risk_assessment: "medium",
    false_positives: "Technical assets which do not process requests regarding functionality or data linked to end-users (customers) can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 308,
};

pub struct MissingAuthenticationSecondFactor;

impl RiskRule for MissingAuthenticationSecondFactor {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model.in_scope_technical_assets() {
            if asset.technology.is_traffic_forwarding()
                || asset.technology.is_unprotected_comms_tolerated()
                || !needs_authentication(model, asset)
            {
                continue;
            }
            for link in model.incoming_links(&asset.id) {
                if !is_authenticating_caller(model, link) {
                    continue;
                }
                let Some(caller) = model.technical_asset(&link.source_id) else {
                    continue;
                };
                if caller.used_as_client_by_human {
                    if lacks_second_factor(model, link) {
                        push_unique(&mut risks, second_factor_risk(model, asset, AccessPath::direct(link)));
                    }
                } else if caller.technology.is_traffic_forwarding() {
                    // Humans reaching the asset through a proxy or load balancer.
                    for origin in model.incoming_links(&caller.id) {
                        if !is_authenticating_caller(model, origin) {
                            continue;
                        }
                        let human = model
                            .technical_asset(&origin.source_id)
                            .map_or(false, |source| source.used_as_client_by_human);
                        if human && lacks_second_factor(model, origin) {
                            let path = AccessPath {
                                link,
                                origin,
                                hop: Some(caller.title.as_str()),
                            };
                            push_unique(&mut risks, second_factor_risk(model, asset, path));
                        }
                    }
                }
            }
        }
        Ok(risks)
    }
}

fn lacks_second_factor(model: &ParsedModel, link: &CommunicationLink) -> bool {
    let sensitive = link.highest_confidentiality(model) >= Confidentiality::Confidential
        || link.highest_integrity(model) >= Criticality::Critical;
    sensitive && link.authentication != Authentication::TwoFactor
}

fn second_factor_risk(
    model: &ParsedModel,
    asset: &TechnicalAsset,
    path: AccessPath<'_>,
) -> Risk {
    authentication_risk(
        model,
        INFO.id,
        asset,
        path,
        RiskExploitationImpact::Medium,
        RiskExploitationLikelihood::Unlikely,
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, data, ids, link, run, Fixture};
    use crate::technology::Technology;

    #[test]
    fn human_clients_behind_a_proxy_share_one_risk() {
        let mut shop = asset("shop", Technology::WebApplication);
        shop.multi_tenant = true;
        let mut browser = asset("browser", Technology::Browser);
        browser.used_as_client_by_human = true;
        let mut mobile = asset("mobile", Technology::MobileApp);
        mobile.used_as_client_by_human = true;

        let mut forward = link("proxy", "Forward", "shop", Protocol::Https);
        forward.authentication = Authentication::Token;
        let mut web = link("browser", "Web", "proxy", Protocol::Https);
        web.authentication = Authentication::Credentials;
        web.data_assets_sent = vec!["orders".to_string()];
        let mut app = link("mobile", "App", "proxy", Protocol::Https);
        app.authentication = Authentication::Credentials;
        app.data_assets_received = vec!["orders".to_string()];

        let model = Fixture::new()
            .data(data("orders", Confidentiality::Confidential, Criticality::Important))
            .asset(shop)
            .asset(browser)
            .asset(mobile)
            .asset(asset("proxy", Technology::ReverseProxy))
            .link(forward)
            .link(web)
            .link(app)
            .build();

        let risks = run(&MissingAuthenticationSecondFactor, model);
        assert_eq!(
            ids(&risks),
            vec!["missing-authentication-second-factor@proxy>forward@proxy@shop"]
        );
        assert_eq!(
            risks[0].title,
            "Missing Two-Factor Authentication covering communication link Forward from browser forwarded via proxy to shop"
        );
    }

    #[test]
    fn two_factor_link_is_accepted() {
        let mut shop = asset("shop", Technology::WebApplication);
        shop.multi_tenant = true;
        let mut browser = asset("browser", Technology::Browser);
        browser.used_as_client_by_human = true;
        let mut web = link("browser", "Web", "shop", Protocol::Https);
        web.authentication = Authentication::TwoFactor;
        web.data_assets_sent = vec!["orders".to_string()];
        let model = Fixture::new()
            .data(data("orders", Confidentiality::Confidential, Criticality::Important))
            .asset(shop)
            .asset(browser)
            .link(web)
            .build();
        assert!(run(&MissingAuthenticationSecondFactor, model).is_empty());
    }
}
