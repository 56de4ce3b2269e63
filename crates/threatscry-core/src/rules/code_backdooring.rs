use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{ParsedModel, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride, Usage,
};

use super::{sorted_unique, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "code-backdooring",
    title: "Code Backdooring",
    description: "For each build-pipeline component Code Backdooring risks might arise where attackers compromise the build-pipeline in order to let backdoored artifacts be shipped into production. Aside from direct code backdooring this includes backdooring of dependencies and even of more lower-level build infrastructure, like backdooring compilers (similar to what the XcodeGhost malware did) or dependencies.",
    impact: "If this risk remains unmitigated, attackers might be able to execute code on and completely takeover production environments.",
    asvs: "V10 - Malicious Code Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Vulnerable_Dependency_Management_Cheat_Sheet.html",
    action: "Build Pipeline Hardening",
    mitigation: "Reduce the attack surface of backdooring the build pipeline by not directly exposing the build pipeline components on the public internet and also not exposing it in front of unmanaged (out-of-scope) developer clients.Also consider the use of code signing to prevent code modifications.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::Tampering,
    detection_logic: "In-scope development relevant technical assets which are either accessed by out-of-scope unmanaged developer clients and/or are directly accessed by any kind of internet-located (non-VPN) component or are themselves directly located on the internet.",
    risk_assessment: "The risk rating depends on the confidentiality and integrity rating of the code being handled and deployed as well as the placement/calling of this technical asset on/from the internet.",
    false_positives: "When the build-pipeline and sourcecode-repo is not exposed to the internet and considered fully trusted (which implies that all accessing clients are also considered fully trusted in terms of their patch management and applied hardening, which must be equivalent to a managed developer client environment) this can be considered a false positive after individual review.",
    model_failure_possible_reason: false,
    cwe: 912,
};

pub struct CodeBackdooring;

impl RiskRule for CodeBackdooring {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .in_scope_technical_assets()
            .filter(|asset| asset.technology.is_development_relevant())
            .filter(|asset| asset.internet || is_exposed_to_untrusted_callers(model, asset))
            .map(|asset| risk(model, asset))
            .collect())
    }
}

/// Reached by internet clients outside a VPN, or by unmanaged (out-of-scope) callers.
fn is_exposed_to_untrusted_callers(model: &ParsedModel, asset: &TechnicalAsset) -> bool {
    model.incoming_links(&asset.id).iter().any(|link| {
        model
            .technical_asset(&link.source_id)
            .map_or(false, |caller| (!link.vpn && caller.internet) || caller.out_of_scope)
    })
}

fn risk(model: &ParsedModel, asset: &TechnicalAsset) -> Risk {
    let impact = if asset.technology == Technology::CodeInspectionPlatform {
        RiskExploitationImpact::Low
    } else if asset.highest_confidentiality(model) >= Confidentiality::Confidential
        || asset.highest_integrity(model) >= Criticality::Critical
    {
        RiskExploitationImpact::High
    } else {
        RiskExploitationImpact::Medium
    };

    // Deployment targets receiving code (integrity rated data) are breached as well.
    let targets = asset
        .communication_links
        .iter()
        .filter(|link| link.usage == Usage::DevOps)
        .filter(|link| {
            link.data_assets_sent.iter().any(|id| {
                model
                    .data_asset(id)
                    .map_or(false, |data| data.integrity >= Criticality::Important)
            })
        })
        .map(|link| link.target_id.clone());
    let breach = sorted_unique(std::iter::once(asset.id.clone()).chain(targets));

    Risk::new(
        INFO.id,
        RiskExploitationLikelihood::Unlikely,
        impact,
        format!("Code Backdooring risk at {}", asset.title),
    )
    .technical_asset(&asset.id)
    .breach(DataBreachProbability::Probable, breach)
    .identified_by(&[&asset.id])
}
