use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    Criticality, DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride, Usage,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "cross-site-request-forgery",
    title: "Cross-Site Request Forgery (CSRF)",
    description: "When a web application is accessed via web protocols Cross-Site Request Forgery (CSRF) risks might arise.",
    impact: "If this risk remains unmitigated, attackers might be able to trick logged-in victim users into unwanted actions within the web application by visiting an attacker controlled web site.",
    asvs: "V4 - Access Control Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Cross-Site_Request_Forgery_Prevention_Cheat_Sheet.html",
    action: "CSRF Prevention",
    mitigation: "Try to use anti-CSRF tokens ot the double-submit patterns (at least for logged-in requests). When your authentication scheme depends on cookies (like session or token cookies), consider marking them with the same-site flag. When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Development,
    stride: Stride::Spoofing,
    detection_logic: "In-scope web applications accessed via typical web access protocols.",
    risk_assessment: "The risk rating depends on the integrity rating of the data sent across the communication link.",
    false_positives: "Web applications passing the authentication sate via custom headers instead of cookies can eventually be false positives. Also when the web application is not accessed via a browser-like component (i.e not by a human user initiating the request that gets passed through all components until it reaches the web application) this can be considered a false positive.",
    model_failure_possible_reason: false,
    cwe: 352,
};

pub struct CrossSiteRequestForgery;

impl RiskRule for CrossSiteRequestForgery {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model
            .in_scope_technical_assets()
            .filter(|asset| asset.technology.is_web_application())
        {
            for link in model
                .incoming_links(&asset.id)
                .iter()
                .filter(|link| link.protocol.is_potential_web_access_protocol())
            {
                let Some(source) = model.technical_asset(&link.source_id) else {
                    continue;
                };
                let likelihood = if link.usage == Usage::DevOps {
                    RiskExploitationLikelihood::Likely
                } else {
                    RiskExploitationLikelihood::VeryLikely
                };
                let impact = if link.highest_integrity(model) == Criticality::MissionCritical {
                    RiskExploitationImpact::Medium
                } else {
                    RiskExploitationImpact::Low
                };
                risks.push(
                    Risk::new(
                        INFO.id,
                        likelihood,
                        impact,
                        format!(
                            "Cross-Site Request Forgery (CSRF) risk at {} via {} from {}",
                            asset.title, link.title, source.title
                        ),
                    )
                    .technical_asset(&asset.id)
                    .communication_link(&link.id)
                    .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
                    .identified_by(&[&asset.id, &link.id]),
                );
            }
        }
        Ok(risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, ids, link, run, Fixture};
    use crate::technology::Technology;

    #[test]
    fn one_risk_per_web_access_link() {
        let mut admin = link("ops", "Admin", "shop", Protocol::Https);
        admin.usage = Usage::DevOps;
        let model = Fixture::new()
            .asset(asset("shop", Technology::WebApplication))
            .asset(asset("browser", Technology::Browser))
            .asset(asset("ops", Technology::DevOpsClient))
            .link(link("browser", "Web", "shop", Protocol::Https))
            .link(admin)
            .link(link("ops", "Db", "shop", Protocol::Jdbc))
            .build();
        let risks = run(&CrossSiteRequestForgery, model);
        assert_eq!(
            ids(&risks),
            vec![
                "cross-site-request-forgery@shop@browser>web",
                "cross-site-request-forgery@shop@ops>admin"
            ]
        );
        assert_eq!(risks[0].exploitation_likelihood, RiskExploitationLikelihood::VeryLikely);
        assert_eq!(risks[1].exploitation_likelihood, RiskExploitationLikelihood::Likely);
        assert_eq!(risks[0].title, "Cross-Site Request Forgery (CSRF) risk at shop via Web from browser");
    }
}
