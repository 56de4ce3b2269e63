use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::TechnicalAsset;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, EncryptionStyle, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "unencrypted-asset",
    title: "Unencrypted Technical Assets",
    description: "Due to the confidentiality rating of the technical asset itself and/or the processed data assets this technical asset must be encrypted. The risk rating depends on the sensitivity technical asset itself and of the data assets stored.",
    impact: "If this risk is unmitigated, attackers might be able to access unencrypted data when successfully compromising sensitive components.",
    asvs: "V6 - Stored Cryptography Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Cryptographic_Storage_Cheat_Sheet.html",
    action: "Encryption of Technical Asset",
    mitigation: "Apply encryption to the technical asset.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::InformationDisclosure,
    detection_logic: "In-scope unencrypted technical assets (excluding reverse-proxy, load-balancer, waf, ids, ips and embedded components like library) storing data assets rated at least as confidential or critical. For technical assets storing data assets rated as strictly-confidential or mission-critical the encryption must be of type data-with-enduser-individual-key.",
    risk_assessment: "Depending on the confidentiality rating of the stored data-assets either medium or high risk.",
    false_positives: "When all sensitive data stored within the asset is already fully encrypted on document or data level.",
    model_failure_possible_reason: false,
    cwe: 311,
};

pub struct UnencryptedAsset;

impl RiskRule for UnencryptedAsset {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model
            .in_scope_technical_assets()
            .filter(|asset| !is_encryption_waiver(asset))
        {
            let confidentiality = asset.highest_confidentiality(model);
            let integrity = asset.highest_integrity(model);
            if confidentiality < Confidentiality::Confidential && integrity < Criticality::Critical {
                continue;
            }
            let very_sensitive = confidentiality == Confidentiality::StrictlyConfidential
                || integrity == Criticality::MissionCritical;
            let requires_enduser_key = very_sensitive && asset.technology.is_usually_storing_enduser_data();
            let impact = match asset.encryption {
                EncryptionStyle::None if very_sensitive => RiskExploitationImpact::High,
                EncryptionStyle::None => RiskExploitationImpact::Medium,
                EncryptionStyle::Transparent
                | EncryptionStyle::DataWithSymmetricSharedKey
                | EncryptionStyle::DataWithAsymmetricSharedKey
                    if requires_enduser_key =>
                {
                    RiskExploitationImpact::Medium
                }
                _ => continue,
            };
            risks.push(risk(asset, impact, requires_enduser_key));
        }
        Ok(risks)
    }
}

/// Traffic handlers and embedded components hold no data at rest of their own.
fn is_encryption_waiver(asset: &TechnicalAsset) -> bool {
    matches!(
        asset.technology,
        Technology::ReverseProxy
            | Technology::LoadBalancer
            | Technology::Waf
            | Technology::Ids
            | Technology::Ips
    ) || asset.technology.is_embedded_component()
}

fn risk(asset: &TechnicalAsset, impact: RiskExploitationImpact, requires_enduser_key: bool) -> Risk {
    let mut title = format!("Unencrypted Technical Asset named {}", asset.title);
    if requires_enduser_key {
        title.push_str(&format!(
            " missing enduser-individual encryption with {}",
            EncryptionStyle::DataWithEnduserIndividualKey
        ));
    }
    Risk::new(INFO.id, RiskExploitationLikelihood::Unlikely, impact, title)
        .technical_asset(&asset.id)
        .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
        .identified_by(&[&asset.id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, ids, run, Fixture};
    use crate::types::{RiskSeverity, TechnicalAssetType};

    fn store(id: &str, technology: Technology, encryption: EncryptionStyle) -> TechnicalAsset {
        let mut asset = asset(id, technology);
        asset.kind = TechnicalAssetType::Datastore;
        asset.confidentiality = Confidentiality::StrictlyConfidential;
        asset.encryption = encryption;
        asset
    }

    #[test]
    fn strictly_confidential_database_without_encryption() {
        let model = Fixture::new()
            .asset(store("db1", Technology::Database, EncryptionStyle::None))
            .build();
        let risks = run(&UnencryptedAsset, model);
        assert_eq!(ids(&risks), vec!["unencrypted-asset@db1"]);
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::High);
        assert_eq!(risks[0].exploitation_likelihood, RiskExploitationLikelihood::Unlikely);
        // unlikely (1) x high (3) = 3
        assert_eq!(risks[0].severity, RiskSeverity::Medium);
        assert_eq!(
            risks[0].title,
            "Unencrypted Technical Asset named db1 missing enduser-individual encryption with data-with-enduser-individual-key"
        );
    }

    #[test]
    fn shared_key_is_not_enough_for_enduser_data() {
        let model = Fixture::new()
            .asset(store("files", Technology::FileServer, EncryptionStyle::Transparent))
            .asset(store("index", Technology::SearchIndex, EncryptionStyle::Transparent))
            .asset(store(
                "vault",
                Technology::Database,
                EncryptionStyle::DataWithEnduserIndividualKey,
            ))
            .build();
        let risks = run(&UnencryptedAsset, model);
        assert_eq!(ids(&risks), vec!["unencrypted-asset@files"]);
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Medium);
    }

    #[test]
    fn waivers_and_insensitive_assets() {
        let mut lb = store("lb", Technology::LoadBalancer, EncryptionStyle::None);
        lb.kind = TechnicalAssetType::Process;
        let model = Fixture::new()
            .asset(lb)
            .asset(asset("web", Technology::WebServer))
            .build();
        assert!(run(&UnencryptedAsset, model).is_empty());
    }
}
