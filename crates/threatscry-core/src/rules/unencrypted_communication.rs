use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, DataAsset, ParsedModel, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    Authentication, Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "unencrypted-communication",
    title: "Unencrypted Communication",
    description: "Due to the confidentiality and/or integrity rating of the data assets transferred over the communication link this connection must be encrypted.",
    impact: "If this risk is unmitigated, network attackers might be able to to eavesdrop on unencrypted sensitive data sent between components.",
    asvs: "V9 - Communication Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Transport_Layer_Protection_Cheat_Sheet.html",
    action: "Encryption of Communication Links",
    mitigation: "Apply transport layer encryption to the communication link.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::InformationDisclosure,
    detection_logic: "Unencrypted technical communication links of in-scope technical assets (excluding monitoring traffic as well as local-file-access and in-process-library-call) transferring sensitive data.",
    risk_assessment: "Depending on the confidentiality rating of the transferred data-assets either medium or high risk.",
    false_positives: "When all sensitive data sent over the communication link is already fully encrypted on document or data level. Also intra-container/pod communication can be considered false positive when container orchestration platform handles encryption.",
    model_failure_possible_reason: false,
    cwe: 319,
};

pub struct UnencryptedCommunication;

impl RiskRule for UnencryptedCommunication {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model.in_scope_technical_assets() {
            for link in &asset.communication_links {
                if link.protocol.is_encrypted() || link.protocol.is_process_local() {
                    continue;
                }
                let Some(target) = model.technical_asset(&link.target_id) else {
                    continue;
                };
                if asset.technology.is_unprotected_comms_tolerated()
                    || target.technology.is_unprotected_comms_tolerated()
                {
                    continue;
                }
                if let Some(high) = exposure(model, link) {
                    risks.push(risk(model, asset, target, link, high));
                }
            }
        }
        Ok(risks)
    }
}

/// Decided by the first sensitive data asset, sent data first. `Some(true)` is the high variant.
fn exposure(model: &ParsedModel, link: &CommunicationLink) -> Option<bool> {
    let carries_credentials = link.authentication != Authentication::None;
    link.data_assets_sent
        .iter()
        .chain(&link.data_assets_received)
        .filter_map(|id| model.data_asset(id))
        .find_map(|data| {
            if is_high_sensitivity(data) || carries_credentials {
                Some(true)
            } else if !link.vpn && is_medium_sensitivity(data) {
                Some(false)
            } else {
                None
            }
        })
}

fn is_high_sensitivity(data: &DataAsset) -> bool {
    data.confidentiality == Confidentiality::StrictlyConfidential
        || data.integrity == Criticality::MissionCritical
}

fn is_medium_sensitivity(data: &DataAsset) -> bool {
    data.confidentiality == Confidentiality::Confidential || data.integrity == Criticality::Critical
}

fn risk(
    model: &ParsedModel,
    asset: &TechnicalAsset,
    target: &TechnicalAsset,
    link: &CommunicationLink,
    high: bool,
) -> Risk {
    let impact = if high {
        RiskExploitationImpact::High
    } else {
        RiskExploitationImpact::Medium
    };
    let likelihood = if link.is_across_trust_boundary_network_only(model) {
        RiskExploitationLikelihood::Likely
    } else {
        RiskExploitationLikelihood::Unlikely
    };
    let mut title = format!(
        "Unencrypted Communication named {} between {} and {}",
        link.title, asset.title, target.title
    );
    if link.authentication != Authentication::None {
        title.push_str(" transferring authentication data (like credentials, token, session-id, etc.)");
    }
    if link.vpn {
        title.push_str(&format!(
            " (even VPN-protected connections need to encrypt their data in-transit when confidentiality is \
             rated {} or integrity is rated {})",
            Confidentiality::StrictlyConfidential,
            Criticality::MissionCritical
        ));
    }
    Risk::new(INFO.id, likelihood, impact, title)
        .technical_asset(&asset.id)
        .communication_link(&link.id)
        .breach(DataBreachProbability::Possible, vec![target.id.clone()])
        .identified_by(&[&link.id, &asset.id, &target.id])
}
