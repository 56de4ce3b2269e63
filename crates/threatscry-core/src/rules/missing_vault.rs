use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::TechnicalAsset;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-vault",
    title: "Missing Vault (Secret Storage)",
    description: "In order to avoid the risk of secret leakage via config files (when attacked through vulnerabilities being able to read files like Path-Traversal and others), it is best practice to use a separate hardened process with proper authentication, authorization, and audit logging to access config secrets (like credentials, private keys, client certificates, etc.). This component is usually some kind of Vault.",
    impact: "If this risk is unmitigated, attackers might be able to easier steal config secrets (like credentials, private keys, client certificates, etc.) once a vulnerability to access files is present and exploited.",
    asvs: "V6 - Stored Cryptography Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Cryptographic_Storage_Cheat_Sheet.html",
    action: "Vault (Secret Storage)",
    mitigation: "Consider using a Vault (Secret Storage) to securely store and access config secrets (like credentials, private keys, client certificates, etc.).",
    check: "Is a Vault (Secret Storage) in place?",
    function: RiskFunction::Architecture,
    stride: Stride::InformationDisclosure,
    detection_logic: "Models without a Vault (Secret Storage).",
    risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
    false_positives: "Models where no technical assets have any kind of sensitive config data to protect can be considered as false positives after individual review.",
    model_failure_possible_reason: true,
    cwe: 522,
};

pub struct MissingVault;

impl RiskRule for MissingVault {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        if model
            .technical_assets
            .values()
            .any(|asset| asset.technology == Technology::Vault)
        {
            return Ok(Vec::new());
        }

        let sensitive = model
            .technical_assets
            .values()
            .any(|asset| Rating::of_asset(asset, model).is_high() || Rating::own(asset).is_high());
        let impact = if sensitive {
            RiskExploitationImpact::Medium
        } else {
            RiskExploitationImpact::Low
        };
        // First asset with the highest sensitivity, in id order.
        let example = model
            .technical_assets
            .values()
            .fold(None, |best: Option<&TechnicalAsset>, asset| match best {
                Some(current) if asset.sensitivity_score() <= current.sensitivity_score() => Some(current),
                _ => Some(asset),
            });

        Ok(example
            .map(|asset| {
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Unlikely,
                    impact,
                    format!(
                        "Missing Vault (Secret Storage) in the threat model (referencing asset {} as an example)",
                        asset.title
                    ),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Improbable, Vec::new())
                .identified_by(&[&asset.id])
            })
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, ids, run, Fixture};
    use crate::types::Criticality;

    #[test]
    fn model_without_vault() {
        let mut billing = asset("billing", Technology::WebServiceRest);
        billing.availability = Criticality::Critical;
        let model = Fixture::new()
            .asset(asset("api", Technology::WebServiceRest))
            .asset(billing)
            .build();
        let risks = run(&MissingVault, model);
        assert_eq!(ids(&risks), vec!["missing-vault@billing"]);
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Medium);
    }

    #[test]
    fn vault_present_even_out_of_scope() {
        let mut vault = asset("hashicorp", Technology::Vault);
        vault.out_of_scope = true;
        let model = Fixture::new()
            .asset(asset("api", Technology::WebServiceRest))
            .asset(vault)
            .build();
        assert!(run(&MissingVault, model).is_empty());
    }

    #[test]
    fn empty_model_has_nothing_to_reference() {
        assert!(run(&MissingVault, Fixture::new().build()).is_empty());
    }
}
