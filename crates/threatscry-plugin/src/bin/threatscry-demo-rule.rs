//! Sample out-of-process risk rule: flags in-scope technical assets that
//! nobody bothered to describe. The loader fills a missing description with
//! the title, so those two being equal means none was given.

use threatscry_core::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
};
use threatscry_core::{AnalysisContext, Risk, RiskCategory, RiskRule, RuleError};
use threatscry_plugin::contract::serve_rule;

const ID: &str = "demo-undocumented-asset";

struct UndocumentedAsset;

impl RiskRule for UndocumentedAsset {
    fn category(&self) -> RiskCategory {
        RiskCategory {
            id: ID.to_string(),
            title: "Undocumented Technical Asset".to_string(),
            description: "Technical assets without a description are hard to review.".to_string(),
            impact: "Reviewers may misjudge what the asset does and miss risks around it.".to_string(),
            asvs: "V1 - Architecture, Design and Threat Modeling Requirements".to_string(),
            cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Threat_Modeling_Cheat_Sheet.html"
                .to_string(),
            action: "Documentation".to_string(),
            mitigation: "Describe the purpose of every in-scope technical asset in the model.".to_string(),
            check: "Does every technical asset carry a meaningful description?".to_string(),
            detection_logic: "In-scope technical assets without a description of their own.".to_string(),
            risk_assessment: "Always low.".to_string(),
            false_positives: "Assets whose title already says everything.".to_string(),
            function: RiskFunction::Architecture,
            stride: Stride::Repudiation,
            model_failure_possible_reason: true,
            cwe: 1059,
        }
    }

    fn supported_tags(&self) -> Vec<String> {
        vec!["demo".to_string()]
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        Ok(ctx
            .model()
            .in_scope_technical_assets()
            .filter(|asset| asset.description == asset.title)
            .map(|asset| {
                Risk::new(
                    ID,
                    RiskExploitationLikelihood::Unlikely,
                    RiskExploitationImpact::Low,
                    format!("Undocumented Technical Asset: {}", asset.title),
                )
                .technical_asset(&asset.id)
                .breach(DataBreachProbability::Improbable, Vec::new())
            })
            .collect())
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    std::process::exit(serve_rule(&UndocumentedAsset, &args));
}
