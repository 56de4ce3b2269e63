use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{ParsedModel, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
    TechnicalAssetType,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-network-segmentation",
    title: "Missing Network Segmentation",
    description: "Highly sensitive assets and/or datastores residing in the same network segment than other lower sensitive assets (like webservers or content management systems etc.) should be better protected by a network segmentation trust-boundary.",
    impact: "If this risk is unmitigated, attackers successfully attacking other components of the system might have an easy path towards more valuable targets, as they are not separated by network segmentation.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Network Segmentation",
    mitigation: "Apply a network segmentation trust-boundary around the highly sensitive assets and/or datastores.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope technical assets with high sensitivity and RAA values as well as datastores when surrounded by assets (without a network trust-boundary in-between) which are of type client-system, web-server, web-application, cms, web-service-rest, web-service-soap, build-pipeline, sourcecode-repository, monitoring, or similar and there is no direct connection between these (hence no requirement to be so close to each other).",
    risk_assessment: "Default is low risk. The risk is increased to medium when the asset missing the trust-boundary protection is rated as strictly-confidential or mission-critical.",
    false_positives: "When all assets within the network segmentation trust-boundary are hardened and protected to the same extend as if all were containing/processing highly sensitive data.",
    model_failure_possible_reason: false,
    cwe: 1008,
};

const RAA_LIMIT: f64 = 50.0;

pub struct MissingNetworkSegmentation;

impl RiskRule for MissingNetworkSegmentation {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .in_scope_technical_assets()
            .filter(|asset| {
                !matches!(
                    asset.technology,
                    Technology::ReverseProxy
                        | Technology::Waf
                        | Technology::Ids
                        | Technology::Ips
                        | Technology::ServiceRegistry
                )
            })
            .filter(|asset| {
                asset.raa >= RAA_LIMIT
                    && (asset.kind == TechnicalAssetType::Datastore || Rating::own(asset).is_high())
            })
            .filter(|asset| has_unrelated_neighbour(model, asset))
            .map(|asset| {
                let impact = if Rating::own(asset).is_top() {
                    RiskExploitationImpact::Medium
                } else {
                    RiskExploitationImpact::Low
                };
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Unlikely,
                    impact,
                    format!(
                        "Missing Network Segmentation to further encapsulate and protect {} against unrelated \
                         lower protected assets in the same network segment, which might be easier to compromise by attackers",
                        asset.title
                    ),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
                .identified_by(&[&asset.id])
            })
            .collect())
    }
}

/// A less protected asset in the same network without any link to this one.
fn has_unrelated_neighbour(model: &ParsedModel, asset: &TechnicalAsset) -> bool {
    model.technical_assets.values().any(|other| {
        other.id != asset.id
            && other.technology.is_less_protected_type()
            && !other.technology.is_close_to_high_value_targets_tolerated()
            && asset.is_same_trust_boundary_network_only(model, &other.id)
            && !asset.has_direct_connection(model, &other.id)
    })
}
