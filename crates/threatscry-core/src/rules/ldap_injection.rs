use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::protocol::Protocol;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride, Usage,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "ldap-injection",
    title: "LDAP-Injection",
    description: "When an LDAP server is accessed LDAP-Injection risks might arise. The risk rating depends on the sensitivity of the LDAP server itself and of the data assets processed or stored.",
    impact: "If this risk remains unmitigated, attackers might be able to modify LDAP queries and access more data from the LDAP server than allowed.",
    asvs: "V5 - Validation, Sanitization and Encoding Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/LDAP_Injection_Prevention_Cheat_Sheet.html",
    action: "LDAP-Injection Prevention",
    mitigation: "Try to use libraries that properly encode LDAP meta characters in searches and queries to access the LDAP sever in order to stay safe from LDAP-Injection vulnerabilities. When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Development,
    stride: Stride::Tampering,
    detection_logic: "In-scope clients accessing LDAP servers via typical LDAP access protocols.",
    risk_assessment: "The risk rating depends on the sensitivity of the LDAP server itself and of the data assets processed or stored.",
    false_positives: "LDAP server queries by search values not consisting of parts controllable by the caller can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 90,
};

pub struct LdapInjection;

impl RiskRule for LdapInjection {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for server in model.technical_assets.values() {
            let impact = if server.highest_confidentiality(model) == Confidentiality::StrictlyConfidential
                || server.highest_integrity(model) == Criticality::MissionCritical
            {
                RiskExploitationImpact::High
            } else {
                RiskExploitationImpact::Medium
            };
            for link in model
                .incoming_links(&server.id)
                .iter()
                .filter(|link| matches!(link.protocol, Protocol::Ldap | Protocol::Ldaps))
            {
                let Some(caller) = model.technical_asset(&link.source_id) else {
                    continue;
                };
                if caller.out_of_scope {
                    continue;
                }
                let likelihood = if link.usage == Usage::DevOps {
                    RiskExploitationLikelihood::Unlikely
                } else {
                    RiskExploitationLikelihood::Likely
                };
                risks.push(
                    Risk::new(
                        INFO.id,
                        likelihood,
                        impact,
                        format!(
                            "LDAP-Injection risk at {} against LDAP server {} via {}",
                            caller.title, server.title, link.title
                        ),
                    )
                    .technical_asset(&caller.id)
                    .communication_link(&link.id)
                    .breach(DataBreachProbability::Probable, vec![server.id.clone()])
                    .identified_by(&[&caller.id, &server.id, &link.id]),
                );
            }
        }
        Ok(risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, ids, link, run, Fixture};
    use crate::technology::Technology;
    use crate::types::RiskSeverity;

    #[test]
    fn ldap_link_from_in_scope_caller() {
        let mut partner = asset("partner", Technology::ClientSystem);
        partner.out_of_scope = true;
        let model = Fixture::new()
            .asset(asset("client1", Technology::WebApplication))
            .asset(asset("ldap1", Technology::LdapServer))
            .asset(partner)
            .link(link("client1", "LDAP Query", "ldap1", Protocol::Ldaps))
            .link(link("partner", "Lookup", "ldap1", Protocol::Ldap))
            .build();
        let risks = run(&LdapInjection, model);
        assert_eq!(ids(&risks), vec!["ldap-injection@client1@ldap1@client1>ldap-query"]);
        assert_eq!(risks[0].severity, RiskSeverity::Elevated);
        assert_eq!(risks[0].most_relevant_technical_asset.as_deref(), Some("client1"));
        assert_eq!(risks[0].data_breach_technical_assets, vec!["ldap1"]);
    }
}
