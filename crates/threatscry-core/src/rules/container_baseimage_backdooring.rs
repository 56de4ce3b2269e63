use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    DataBreachProbability, Machine, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "container-baseimage-backdooring",
    title: "Container Base Image Backdooring",
    description: "When a technical asset is built using container technologies, Base Image Backdooring risks might arise where base images and other layers used contain vulnerable components or backdoors. See for example: https://techcrunch.com/2018/06/15/tainted-crypto-mining-containers-pulled-from-docker-hub/",
    impact: "If this risk is unmitigated, attackers might be able to deeply persist in the target system by executing code in deployed containers.",
    asvs: "V10 - Malicious Code Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Docker_Security_Cheat_Sheet.html",
    action: "Container Infrastructure Hardening",
    mitigation: "Apply hardening of all container infrastructures (see for example the CIS-Benchmarks for Docker and Kubernetes and the Docker Bench for Security). Use only trusted base images of the original vendors, verify digital signatures and apply image creation best practices. Also consider using Google's Distroless base images or otherwise very small base images. Regularly execute container image scans with tools checking the layers for vulnerable components.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS/CSVS applied?",
    function: RiskFunction::Operations,
    stride: Stride::Tampering,
    detection_logic: "In-scope technical assets running as containers.",
    risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets.",
    false_positives: "Fully trusted (i.e. reviewed and cryptographically signed or similar) base images of containers can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 912,
};

pub struct ContainerBaseImageBackdooring;

impl RiskRule for ContainerBaseImageBackdooring {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .in_scope_technical_assets()
            .filter(|asset| asset.machine == Machine::Container)
            .map(|asset| {
                let impact = if Rating::of_asset(asset, model).is_top() {
                    RiskExploitationImpact::High
                } else {
                    RiskExploitationImpact::Medium
                };
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Unlikely,
                    impact,
                    format!("Container Base Image Backdooring risk at {}", asset.title),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Probable, vec![asset.id.clone()])
                .identified_by(&[&asset.id])
            })
            .collect())
    }
}
