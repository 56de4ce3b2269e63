use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::protocol::Protocol;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride, Usage,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "search-query-injection",
    title: "Search-Query Injection",
    description: "When a search engine server is accessed Search-Query Injection risks might arise. See for example https://github.com/veracode-research/solr-injection and https://github.com/veracode-research/solr-injection/blob/master/slides/DEFCON-27-Michael-Stepankin-Apache-Solr-Injection.pdf for more details (here related to Solr, but in general showcasing the topic of search query injections).",
    impact: "If this risk remains unmitigated, attackers might be able to read more data from the search index and eventually further escalate towards a deeper system penetration via code executions.",
    asvs: "V5 - Validation, Sanitization and Encoding Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Injection_Prevention_Cheat_Sheet.html",
    action: "Search-Query Injection Prevention",
    mitigation: "Try to use libraries that properly encode search query meta characters in searches and don't expose the query unfiltered to the caller. When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Development,
    stride: Stride::Tampering,
    detection_logic: "In-scope clients accessing search engine servers via typical search access protocols.",
    risk_assessment: "The risk rating depends on the sensitivity of the search engine server itself and of the data assets processed or stored.",
    false_positives: "Server engine queries by search values not consisting of parts controllable by the caller can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 74,
};

pub struct SearchQueryInjection;

impl RiskRule for SearchQueryInjection {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for engine in model.technical_assets.values().filter(|asset| {
            matches!(asset.technology, Technology::SearchEngine | Technology::SearchIndex)
        }) {
            let confidentiality = engine.highest_confidentiality(model);
            let integrity = engine.highest_integrity(model);
            let impact = if confidentiality == Confidentiality::StrictlyConfidential
                || integrity == Criticality::MissionCritical
            {
                RiskExploitationImpact::High
            } else if confidentiality <= Confidentiality::Internal && integrity == Criticality::Operational {
                RiskExploitationImpact::Low
            } else {
                RiskExploitationImpact::Medium
            };
            for link in model.incoming_links(&engine.id).iter().filter(|link| {
                matches!(
                    link.protocol,
                    Protocol::Http | Protocol::Https | Protocol::Binary | Protocol::BinaryEncrypted
                )
            }) {
                let Some(caller) = model.technical_asset(&link.source_id) else {
                    continue;
                };
                if caller.out_of_scope {
                    continue;
                }
                let likelihood = if link.usage == Usage::DevOps {
                    RiskExploitationLikelihood::Likely
                } else {
                    RiskExploitationLikelihood::VeryLikely
                };
                risks.push(
                    Risk::new(
                        INFO.id,
                        likelihood,
                        impact,
                        format!(
                            "Search Query Injection risk at {} against search engine server {} via {}",
                            caller.title, engine.title, link.title
                        ),
                    )
                    .technical_asset(&caller.id)
                    .communication_link(&link.id)
                    .breach(DataBreachProbability::Probable, vec![engine.id.clone()])
                    .identified_by(&[&caller.id, &engine.id, &link.id]),
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

    #[test]
    fn only_search_protocols_count() {
        let model = Fixture::new()
            .asset(asset("solr", Technology::SearchEngine))
            .asset(asset("shop", Technology::WebApplication))
            .link(link("shop", "Search", "solr", Protocol::Https))
            .link(link("shop", "Admin", "solr", Protocol::Ssh))
            .build();
        let risks = run(&SearchQueryInjection, model);
        assert_eq!(ids(&risks), vec!["search-query-injection@shop@solr@shop>search"]);
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Low);
    }
}
