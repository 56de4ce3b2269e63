use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride, Usage,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "sql-nosql-injection",
    title: "SQL/NoSQL-Injection",
    description: "When a database is accessed via database access protocols SQL/NoSQL-Injection risks might arise. The risk rating depends on the sensitivity technical asset itself and of the data assets processed or stored.",
    impact: "If this risk is unmitigated, attackers might be able to modify SQL/NoSQL queries to steal and modify data and eventually further escalate towards a deeper system penetration via code executions.",
    asvs: "V5 - Validation, Sanitization and Encoding Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/SQL_Injection_Prevention_Cheat_Sheet.html",
    action: "SQL/NoSQL-Injection Prevention",
    mitigation: "Try to use parameter binding to be safe from injection vulnerabilities. When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Development,
    stride: Stride::Tampering,
    detection_logic: "Database accessed via typical database access protocols by in-scope clients.",
    risk_assessment: "The risk rating depends on the sensitivity of the data stored inside the database.",
    false_positives: "Database accesses by queries not consisting of parts controllable by the caller can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 89,
};

pub struct SqlNosqlInjection;

impl RiskRule for SqlNosqlInjection {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for database in model.technical_assets.values() {
            let impact = if database.highest_confidentiality(model) == Confidentiality::StrictlyConfidential
                || database.highest_integrity(model) == Criticality::MissionCritical
            {
                RiskExploitationImpact::High
            } else {
                RiskExploitationImpact::Medium
            };
            for link in model
                .incoming_links(&database.id)
                .iter()
                .filter(|link| is_database_access(database, link))
            {
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
                            "SQL/NoSQL-Injection risk at {} against database {} via {}",
                            caller.title, database.title, link.title
                        ),
                    )
                    .technical_asset(&caller.id)
                    .communication_link(&link.id)
                    .breach(DataBreachProbability::Probable, vec![database.id.clone()])
                    .identified_by(&[&caller.id, &database.id, &link.id]),
                );
            }
        }
        Ok(risks)
    }
}

/// Dedicated database protocols always count; HTTP and binary only towards databases.
fn is_database_access(target: &TechnicalAsset, link: &CommunicationLink) -> bool {
    let database = matches!(
        target.technology,
        Technology::Database | Technology::IdentityStoreDatabase
    );
    link.protocol.is_potential_database_access_protocol(false)
        || (database && link.protocol.is_potential_database_access_protocol(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, ids, link, run, Fixture};

    #[test]
    fn lax_protocols_only_against_databases() {
        let model = Fixture::new()
            .asset(asset("app", Technology::WebApplication))
            .asset(asset("couch", Technology::Database))
            .asset(asset("cache", Technology::WebServiceRest))
            .asset(asset("legacy", Technology::Mainframe))
            .link(link("app", "Documents", "couch", Protocol::Https))
            .link(link("app", "Cache", "cache", Protocol::Https))
            .link(link("app", "Accounts", "legacy", Protocol::Jdbc))
            .build();
        let risks = run(&SqlNosqlInjection, model);
        assert_eq!(
            ids(&risks),
            vec![
                "sql-nosql-injection@app@couch@app>documents",
                "sql-nosql-injection@app@legacy@app>accounts",
            ]
        );
    }
}
