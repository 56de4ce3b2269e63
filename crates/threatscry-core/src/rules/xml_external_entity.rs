use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    DataBreachProbability, DataFormat, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "xml-external-entity",
    title: "XML External Entity (XXE)",
    description: "When a technical asset accepts data in XML format, XML External Entity (XXE) risks might arise.",
    impact: "If this risk is unmitigated, attackers might be able to read sensitive files (configuration data, key/credential files, deployment files, business data files, etc.) form the filesystem of affected components and/or access sensitive services or files of other components.",
    asvs: "V14 - Configuration Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/XML_External_Entity_Prevention_Cheat_Sheet.html",
    action: "XML Parser Hardening",
    mitigation: "Apply hardening of all XML parser instances in order to stay safe from XML External Entity (XXE) vulnerabilities. When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Development,
    stride: Stride::InformationDisclosure,
    detection_logic: "In-scope technical assets accepting XML data formats.",
    risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored. Also for cloud-based environments the exploitation impact is at least medium, as cloud backend services can be attacked via SSRF (and XXE vulnerabilities are often also SSRF vulnerabilities).",
    false_positives: "Fully trusted (i.e. cryptographically signed or similar) XML data can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 611,
};

pub struct XmlExternalEntity;

impl RiskRule for XmlExternalEntity {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .in_scope_technical_assets()
            .filter(|asset| asset.accepts(DataFormat::Xml))
            .map(|asset| {
                let impact = if Rating::of_asset(asset, model).is_top() {
                    RiskExploitationImpact::High
                } else {
                    RiskExploitationImpact::Medium
                };
                // TODO: widen the breach list to the asset's reachable targets, as server-side-request-forgery does.
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::VeryLikely,
                    impact,
                    format!("XML External Entity (XXE) risk at {}", asset.title),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Probable, vec![asset.id.clone()])
                .identified_by(&[&asset.id])
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, data, ids, run, Fixture};
    use crate::technology::Technology;
    use crate::types::{Confidentiality, Criticality, RiskSeverity};

    #[test]
    fn xml_endpoints_rated_by_processed_data() {
        let mut soap = asset("soap", Technology::WebServiceSoap);
        soap.data_formats_accepted = vec![DataFormat::Xml];
        soap.data_assets_processed = vec!["payroll".to_string()];
        let mut feed = asset("feed", Technology::BatchProcessing);
        feed.data_formats_accepted = vec![DataFormat::Xml, DataFormat::Csv];
        let mut ignored = asset("ignored", Technology::WebServiceSoap);
        ignored.data_formats_accepted = vec![DataFormat::Xml];
        ignored.out_of_scope = true;
        let model = Fixture::new()
            .data(data("payroll", Confidentiality::StrictlyConfidential, Criticality::Important))
            .asset(soap)
            .asset(feed)
            .asset(ignored)
            .build();

        let risks = run(&XmlExternalEntity, model);
        assert_eq!(ids(&risks), vec!["xml-external-entity@feed", "xml-external-entity@soap"]);
        assert_eq!(risks[0].severity, RiskSeverity::Elevated);
        assert_eq!(risks[1].severity, RiskSeverity::High);
    }
}
