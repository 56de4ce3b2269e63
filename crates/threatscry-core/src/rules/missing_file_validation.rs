use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    DataBreachProbability, DataFormat, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-file-validation",
    title: "Missing File Validation",
    description: "When a technical asset accepts files, these input files should be strictly validated about filename and type.",
    impact: "If this risk is unmitigated, attackers might be able to provide malicious files to the application.",
    asvs: "V12 - File and Resources Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/File_Upload_Cheat_Sheet.html",
    action: "File Validation",
    mitigation: "Filter by file extension and discard (if feasible) the name provided. Whitelist the accepted file types and determine the mime-type on the server-side (for example via \"Apache Tika\" or similar checks). If the file is retrievable by endusers and/or backoffice employees, consider performing scans for popular malware (if the files can be retrieved much later than they were uploaded, also apply a fresh malware scan during retrieval to scan with newer signatures of popular malware). Also enforce limits on maximum file size to avoid denial-of-service like scenarios.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Development,
    stride: Stride::Spoofing,
    detection_logic: "In-scope technical assets with custom-developed code accepting file data formats.",
    risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
    false_positives: "Fully trusted (i.e. cryptographically signed or similar) files can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 434,
};

pub struct MissingFileValidation;

impl RiskRule for MissingFileValidation {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .in_scope_technical_assets()
            .filter(|asset| asset.custom_developed_parts && asset.accepts(DataFormat::File))
            .map(|asset| {
                let impact = if Rating::of_asset(asset, model).is_top() {
                    RiskExploitationImpact::Medium
                } else {
                    RiskExploitationImpact::Low
                };
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::VeryLikely,
                    impact,
                    format!("Missing File Validation risk at {}", asset.title),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Probable, vec![asset.id.clone()])
                .identified_by(&[&asset.id])
            })
            .collect())
    }
}
