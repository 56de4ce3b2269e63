use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{ParsedModel, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "accidental-secret-leak",
    title: "Accidental Secret Leak",
    description: "Sourcecode repositories (including their histories) as well as artifact registries can accidentally contain secrets like checked-in or packaged-in passwords, API tokens, certificates, crypto keys, etc.",
    impact: "If this risk is unmitigated, attackers which have access to affected sourcecode repositories or artifact registries might find secrets accidentally checked-in.",
    asvs: "V14 - Configuration Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Build Pipeline Hardening",
    mitigation: "Establish measures preventing accidental check-in or package-in of secrets into sourcecode repositories and artifact registries. This starts by using good .gitignore and .dockerignore files, but does not stop there. See for example tools like \"git-secrets\" or \"Talisman\" to have check-in preventive measures for secrets. Consider also to regularly scan your repositories for secrets accidentally checked-in using scanning tools like \"gitleaks\" or \"gitrob\".",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::InformationDisclosure,
    detection_logic: "In-scope sourcecode repositories and artifact registries.",
    risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
    false_positives: "Usually no false positives.",
    model_failure_possible_reason: false,
    cwe: 200,
};

pub struct AccidentalSecretLeak;

impl RiskRule for AccidentalSecretLeak {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn supported_tags(&self) -> Vec<String> {
        super::tags(&["git", "nexus"])
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        Ok(model
            .in_scope_technical_assets()
            .filter(|asset| {
                matches!(
                    asset.technology,
                    Technology::SourcecodeRepository | Technology::ArtifactRegistry
                )
            })
            .map(|asset| risk(model, asset))
            .collect())
    }
}

fn risk(model: &ParsedModel, asset: &TechnicalAsset) -> Risk {
    let title = if asset.is_tagged_with_any(&["git"]) {
        format!(
            "Accidental Secret Leak (Git) risk at {}: Git Leak Prevention",
            asset.title
        )
    } else {
        format!("Accidental Secret Leak risk at {}", asset.title)
    };
    let rating = Rating::of_asset(asset, model);
    let impact = if rating.is_top() {
        RiskExploitationImpact::High
    } else if rating.is_high() {
        RiskExploitationImpact::Medium
    } else {
        RiskExploitationImpact::Low
    };
    Risk::new(INFO.id, RiskExploitationLikelihood::Unlikely, impact, title)
        .technical_asset(&asset.id)
        .breach(DataBreachProbability::Probable, vec![asset.id.clone()])
        .identified_by(&[&asset.id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, data, ids, run, Fixture};
    use crate::types::{Confidentiality, Criticality};

    #[test]
    fn git_tagged_repository_gets_specific_title() {
        let mut repo = asset("repo", Technology::SourcecodeRepository);
        repo.tags = vec!["git".to_string()];
        repo.data_assets_stored = vec!["code".to_string()];
        let model = Fixture::new()
            .data(data("code", Confidentiality::Confidential, Criticality::Critical))
            .asset(repo)
            .asset(asset("registry", Technology::ArtifactRegistry))
            .asset(asset("app", Technology::WebApplication))
            .build();
        let risks = run(&AccidentalSecretLeak, model);
        assert_eq!(ids(&risks), vec!["accidental-secret-leak@registry", "accidental-secret-leak@repo"]);
        assert_eq!(risks[1].title, "Accidental Secret Leak (Git) risk at repo: Git Leak Prevention");
        assert_eq!(risks[1].exploitation_impact, RiskExploitationImpact::Medium);
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Low);
    }
}
