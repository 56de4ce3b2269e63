use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{ParsedModel, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    Criticality, DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride, Usage,
};

use super::{sorted_unique, Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "unchecked-deployment",
    title: "Unchecked Deployment",
    description: "For each build-pipeline component Unchecked Deployment risks might arise when the build-pipeline does not include established DevSecOps best-practices. DevSecOps best-practices scan as part of CI/CD pipelines for vulnerabilities in source- or byte-code, dependencies, container layers, and dynamically against running test systems. There are several open-source and commercial tools existing in the categories DAST, SAST, and IAST.",
    impact: "If this risk remains unmitigated, vulnerabilities in custom-developed software or their dependencies might not be identified during continuous deployment cycles.",
    asvs: "V14 - Configuration Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Vulnerable_Dependency_Management_Cheat_Sheet.html",
    action: "Build Pipeline Hardening",
    mitigation: "Apply DevSecOps best-practices and use scanning tools to identify vulnerabilities in source- or byte-code,dependencies, container layers, and optionally also via dynamic scans against running test systems.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::Tampering,
    detection_logic: "All development-relevant technical assets.",
    risk_assessment: "The risk rating depends on the highest rating of the technical assets and data assets processed by deployment-receiving targets.",
    false_positives: "When the build-pipeline does not build any software components it can be considered a false positive after individual review.",
    model_failure_possible_reason: false,
    cwe: 1127,
};

pub struct UncheckedDeployment;

impl RiskRule for UncheckedDeployment {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .technical_assets
            .values()
            .filter(|asset| asset.technology.is_development_relevant())
            .map(|asset| risk(model, asset))
            .collect())
    }
}

fn risk(model: &ParsedModel, asset: &TechnicalAsset) -> Risk {
    let mut impact = RiskExploitationImpact::Low;
    let mut breach = vec![asset.id.clone()];
    for link in asset
        .communication_links
        .iter()
        .filter(|link| link.usage == Usage::DevOps)
    {
        let ships_code = link.data_assets_sent.iter().any(|id| {
            model
                .data_asset(id)
                .map_or(false, |data| data.integrity >= Criticality::Important)
        });
        if !ships_code {
            continue;
        }
        breach.push(link.target_id.clone());
        if model
            .technical_asset(&link.target_id)
            .map_or(false, |target| Rating::of_asset(target, model).is_high())
        {
            impact = RiskExploitationImpact::Medium;
        }
    }

    Risk::new(
        INFO.id,
        RiskExploitationLikelihood::Unlikely,
        impact,
        format!("Unchecked Deployment risk at {}", asset.title),
    )
    .technical_asset(&asset.id)
    .breach(DataBreachProbability::Possible, sorted_unique(breach))
    .identified_by(&[&asset.id])
}
