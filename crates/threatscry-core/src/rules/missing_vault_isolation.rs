use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
    TechnicalAssetType,
};

use super::{exposure, Exposure, Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-vault-isolation",
    title: "Missing Vault Isolation",
    description: "Highly sensitive vault assets and their datastores should be isolated from other assets by their own network segmentation trust-boundary (execution-environment boundaries do not count as network isolation).",
    impact: "If this risk is unmitigated, attackers successfully attacking other components of the system might have an easy path towards highly sensitive vault assets and their datastores, as they are not separated by network segmentation.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Network Segmentation",
    mitigation: "Apply a network segmentation trust-boundary around the highly sensitive vault assets and their datastores.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope vault assets when surrounded by other (not vault-related) assets (without a network trust-boundary in-between). This risk is especially prevalent when other non-vault related assets are within the same execution environment (i.e. same database or same application server).",
    risk_assessment: "Default is medium impact. The impact is increased to high when the asset missing the trust-boundary protection is rated as strictly-confidential or mission-critical.",
    false_positives: "When all assets within the network segmentation trust-boundary are hardened and protected to the same extend as if all were vaults with data of highest sensitivity.",
    model_failure_possible_reason: false,
    cwe: 1008,
};

pub struct MissingVaultIsolation;

impl RiskRule for MissingVaultIsolation {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for vault in model
            .in_scope_technical_assets()
            .filter(|asset| asset.technology == Technology::Vault)
        {
            // The vault's own storage backend does not count as unrelated.
            let Some(exposure) = exposure(model, vault, |other| {
                other.technology != Technology::Vault
                    && !(other.kind == TechnicalAssetType::Datastore
                        && vault.has_direct_connection(model, &other.id))
            }) else {
                continue;
            };
            let impact = if Rating::own(vault).is_top() {
                RiskExploitationImpact::High
            } else {
                RiskExploitationImpact::Medium
            };
            let likelihood = match exposure {
                Exposure::ExecutionEnvironment => RiskExploitationLikelihood::Likely,
                Exposure::NetworkSegment => RiskExploitationLikelihood::Unlikely,
            };
            risks.push(
                Risk::new(
                    INFO.id,
                    likelihood,
                    impact,
                    format!(
                        "Missing Vault Isolation to further encapsulate and protect vault-related asset {} \
                         against unrelated lower protected assets {}, which might be easier to compromise by attackers",
                        vault.title,
                        exposure.describe()
                    ),
                )
                .technical_asset(&vault.id)
                .breach(DataBreachProbability::Improbable, vec![vault.id.clone()])
                .identified_by(&[&vault.id]),
            );
        }
        Ok(risks)
    }
}
