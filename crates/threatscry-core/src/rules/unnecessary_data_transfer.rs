use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, DataAsset, ParsedModel, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::{push_unique, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "unnecessary-data-transfer",
    title: "Unnecessary Data Transfer",
    description: "When a technical asset sends or receives data assets, which it neither processes or stores this is an indicator for unnecessarily transferred data (or for an incomplete model). When the unnecessarily transferred data assets are sensitive, this poses an unnecessary risk of an increased attack surface.",
    impact: "If this risk is unmitigated, attackers might be able to target unnecessarily transferred data.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Attack Surface Reduction",
    mitigation: "Try to avoid sending or receiving sensitive data assets which are not required (i.e. neither processed or stored) by the involved technical asset.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope technical assets sending or receiving sensitive data assets which are neither processed nor stored by the technical asset are flagged with this risk. The risk rating (low or medium) depends on the confidentiality, integrity, and availability rating of the technical asset. Monitoring data is exempted from this risk.",
    risk_assessment: "The risk assessment is depending on the confidentiality and integrity rating of the transferred data asset either low or medium.",
    false_positives: "Technical assets missing the model entries of either processing or storing the mentioned data assets can be considered as false positives (incomplete models) after individual review. These should then be addressed by completing the model so that all necessary data assets are processed and/or stored by the technical asset involved.",
    model_failure_possible_reason: true,
    cwe: 1008,
};

pub struct UnnecessaryDataTransfer;

impl RiskRule for UnnecessaryDataTransfer {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model.in_scope_technical_assets() {
            for link in &asset.communication_links {
                check_link(model, &mut risks, asset, link, &link.target_id);
            }
            let mut incoming: Vec<&CommunicationLink> = model.incoming_links(&asset.id).iter().collect();
            incoming.sort_by(|a, b| a.id.cmp(&b.id));
            for link in incoming {
                check_link(model, &mut risks, asset, link, &link.source_id);
            }
        }
        Ok(risks)
    }
}

fn check_link(
    model: &ParsedModel,
    risks: &mut Vec<Risk>,
    asset: &TechnicalAsset,
    link: &CommunicationLink,
    partner_id: &str,
) {
    let Some(partner) = model.technical_asset(partner_id) else {
        return;
    };
    if partner.technology.is_unnecessary_data_tolerated() {
        return;
    }
    let transferred = link
        .data_assets_sent
        .iter()
        .chain(&link.data_assets_received)
        .filter(|id| !asset.processes_or_stores_data_asset(id))
        .filter_map(|id| model.data_asset(id))
        .filter(|data| {
            data.confidentiality >= Confidentiality::Confidential || data.integrity >= Criticality::Critical
        });
    for data in transferred {
        push_unique(risks, risk(asset, data, partner));
    }
}

fn risk(asset: &TechnicalAsset, data: &DataAsset, partner: &TechnicalAsset) -> Risk {
    let impact = if data.confidentiality == Confidentiality::StrictlyConfidential
        || data.integrity == Criticality::MissionCritical
    {
        RiskExploitationImpact::Medium
    } else {
        RiskExploitationImpact::Low
    };
    Risk::new(
        INFO.id,
        RiskExploitationLikelihood::Unlikely,
        impact,
        format!(
            "Unnecessary Data Transfer of {} data at {} from/to {}",
            data.title, asset.title, partner.title
        ),
    )
    .technical_asset(&asset.id)
    .data_asset(&data.id)
    .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
    .identified_by(&[&data.id, &asset.id, &partner.id])
}
