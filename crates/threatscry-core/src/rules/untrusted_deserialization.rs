use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, ParsedModel, TechnicalAsset};
use crate::protocol::Protocol;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, DataFormat, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "untrusted-deserialization",
    title: "Untrusted Deserialization",
    description: "When a technical asset accepts data in a specific serialized form (like Java or .NET serialization), Untrusted Deserialization risks might arise. See https://christian-schneider.net/JavaDeserializationSecurityFAQ.html for more details.",
    impact: "If this risk is unmitigated, attackers might be able to execute code on target systems by exploiting untrusted deserialization endpoints.",
    asvs: "V5 - Validation, Sanitization and Encoding Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Deserialization_Cheat_Sheet.html",
    action: "Prevention of Deserialization of Untrusted Data",
    mitigation: "Try to avoid the deserialization of untrusted data (even of data within the same trust-boundary as long as it is sent across a remote connection) in order to stay safe from Untrusted Deserialization vulnerabilities. Alternatively a strict whitelisting approach of the classes/types/values to deserialize might help as well. When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::Tampering,
    detection_logic: "In-scope technical assets accepting serialization data formats (including EJB and RMI protocols).",
    risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
    false_positives: "Fully trusted (i.e. cryptographically signed or similar) data deserialized can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 502,
};

pub struct UntrustedDeserialization;

impl RiskRule for UntrustedDeserialization {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model.in_scope_technical_assets() {
            let remote_calls: Vec<&CommunicationLink> = model
                .incoming_links(&asset.id)
                .iter()
                .filter(|link| is_object_protocol(link.protocol))
                .collect();
            let deserializes = asset.accepts(DataFormat::Serialization)
                || asset.technology == Technology::Ejb
                || !remote_calls.is_empty();
            if !deserializes {
                continue;
            }
            let crossing = remote_calls
                .iter()
                .rev()
                .find(|link| link.is_across_trust_boundary_network_only(model));
            risks.push(risk(model, asset, crossing.copied()));
        }
        Ok(risks)
    }
}

fn is_object_protocol(protocol: Protocol) -> bool {
    matches!(
        protocol,
        Protocol::Iiop | Protocol::IiopEncrypted | Protocol::Jrmp | Protocol::JrmpEncrypted
    )
}

fn risk(model: &ParsedModel, asset: &TechnicalAsset, crossing: Option<&CommunicationLink>) -> Risk {
    let mut title = format!("Untrusted Deserialization risk at {}", asset.title);
    let likelihood = match crossing {
        Some(link) => {
            title.push_str(&format!(
                " across a trust boundary (at least via communication link {})",
                link.title
            ));
            RiskExploitationLikelihood::VeryLikely
        }
        None => RiskExploitationLikelihood::Likely,
    };
    let impact = if Rating::of_asset(asset, model).is_top() {
        RiskExploitationImpact::VeryHigh
    } else {
        RiskExploitationImpact::High
    };
    Risk::new(INFO.id, likelihood, impact, title)
        .technical_asset(&asset.id)
        .breach(DataBreachProbability::Probable, vec![asset.id.clone()])
        .identified_by(&[&asset.id])
}
