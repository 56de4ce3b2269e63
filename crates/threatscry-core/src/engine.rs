use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::error::{AnalysisError, EngineError, RuleError};
use crate::model::{IndividualRiskCategory, ParsedModel};
use crate::risk::{sort_categories, sort_risks, Risk, RiskCategory, RiskStatistics};
use crate::tracking::{reconcile, TrackingOutcome};

/// A risk rule: static category metadata plus detection logic over the model graph.
pub trait RiskRule: Send + Sync {
    fn category(&self) -> RiskCategory;

    /// Tags the rule looks at. They are added to the tag catalogue of a run.
    fn supported_tags(&self) -> Vec<String> {
        Vec::new()
    }

    /// Must only read the context; every returned risk carries this rule's category id.
    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError>;
}

/// Risks declared by the modeller inside the model file.
pub struct IndividualRiskRule {
    category: IndividualRiskCategory,
}

impl IndividualRiskRule {
    pub fn new(category: IndividualRiskCategory) -> Self {
        IndividualRiskRule { category }
    }
}

impl RiskRule for IndividualRiskRule {
    fn category(&self) -> RiskCategory {
        self.category.category.clone()
    }

    fn generate_risks(&self, _ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        Ok(self.category.risks_identified.clone())
    }
}

// --- Registry ---

/// Ordered rule set keyed by category id.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn RiskRule>>,
    ids: BTreeSet<String>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in rules, in category id order.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for rule in crate::rules::builtin_rules() {
            let id = rule.category().id;
            if registry.ids.insert(id) {
                registry.rules.push(rule);
            }
        }
        registry
    }

    pub fn register(&mut self, rule: Box<dyn RiskRule>) -> Result<(), EngineError> {
        let id = rule.category().id;
        if !self.ids.insert(id.clone()) {
            return Err(EngineError::DuplicateCategory(id));
        }
        debug!(rule = %id, "registered risk rule");
        self.rules.push(rule);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&dyn RiskRule> {
        self.rules
            .iter()
            .find(|rule| rule.category().id == id)
            .map(|rule| rule.as_ref())
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn RiskRule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// --- Context ---

/// State of one analysis run, handed to every rule.
pub struct AnalysisContext {
    model: ParsedModel,
    tags: BTreeSet<String>,
    risks_by_category: BTreeMap<String, Vec<Risk>>,
    categories: BTreeMap<String, RiskCategory>,
}

impl AnalysisContext {
    pub fn new(model: ParsedModel) -> Self {
        let tags = model
            .tags_available
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .collect();
        AnalysisContext {
            model,
            tags,
            risks_by_category: BTreeMap::new(),
            categories: BTreeMap::new(),
        }
    }

    pub fn model(&self) -> &ParsedModel {
        &self.model
    }

    /// Model tags plus the tags of every rule executed so far.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn risks_by_category(&self) -> &BTreeMap<String, Vec<Risk>> {
        &self.risks_by_category
    }

    fn execute(&mut self, rule: &dyn RiskRule) -> Result<(), EngineError> {
        let category = rule.category();
        self.tags.extend(
            rule.supported_tags()
                .iter()
                .map(|tag| tag.trim().to_lowercase()),
        );

        let risks = rule.generate_risks(self).map_err(|source| EngineError::Rule {
            rule: category.id.clone(),
            source,
        })?;
        if let Some(foreign) = risks.iter().find(|risk| risk.category != category.id) {
            return Err(EngineError::Rule {
                rule: category.id.clone(),
                source: RuleError::ForeignCategory {
                    synthetic_id: foreign.synthetic_id.clone(),
                    expected: category.id.clone(),
                    found: foreign.category.clone(),
                },
            });
        }

        debug!(rule = %category.id, risks = risks.len(), "risk rule executed");
        if !risks.is_empty() {
            self.risks_by_category.insert(category.id.clone(), risks);
        }
        self.categories.insert(category.id.clone(), category);
        Ok(())
    }
}

// --- Analysis ---

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Category ids of rules not to execute.
    pub skip_risk_rules: Vec<String>,
    pub ignore_orphaned_risk_tracking: bool,
}

impl AnalysisOptions {
    /// Parse a comma separated skip list such as `"missing-vault, xxe"`.
    pub fn skip_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Everything a report writer needs, in presentation order.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub model: ParsedModel,
    /// Categories of all executed rules, by highest open severity then title.
    pub categories: Vec<RiskCategory>,
    /// All risks sorted by severity, status, impact, likelihood and title.
    pub risks: Vec<Risk>,
    /// Sorted risks per category id.
    pub risks_by_category: BTreeMap<String, Vec<Risk>>,
    pub statistics: RiskStatistics,
    pub tracking: TrackingOutcome,
    pub tags: Vec<String>,
    pub skipped_rules: Vec<String>,
    pub unknown_skipped_rules: Vec<String>,
    /// Lower-cased synthetic id to position in `risks`.
    synthetic_ids: BTreeMap<String, usize>,
}

impl AnalysisReport {
    /// Look up a risk by synthetic id, ignoring case.
    pub fn risk(&self, synthetic_id: &str) -> Option<&Risk> {
        self.synthetic_ids
            .get(&synthetic_id.to_lowercase())
            .and_then(|index| self.risks.get(*index))
    }

    /// Categories that produced at least one risk.
    pub fn categories_with_risks(&self) -> impl Iterator<Item = &RiskCategory> {
        self.categories
            .iter()
            .filter(|category| self.risks_by_category.contains_key(&category.id))
    }
}

/// Run every non-skipped rule over the model, then reconcile risk tracking.
///
/// Risks from the model's individual risk categories are registered as rules
/// after everything in `registry`, so their ids may not clash with it.
pub fn analyze(
    model: ParsedModel,
    mut registry: RuleRegistry,
    options: &AnalysisOptions,
) -> Result<AnalysisReport, AnalysisError> {
    for individual in model.individual_risk_categories.values() {
        registry.register(Box::new(IndividualRiskRule::new(individual.clone())))?;
    }

    let skip: BTreeSet<String> = options
        .skip_risk_rules
        .iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    let mut ctx = AnalysisContext::new(model);
    let mut skipped_rules = Vec::new();
    for rule in registry.rules() {
        let id = rule.category().id;
        if skip.contains(&id) {
            info!(rule = %id, "skipping risk rule");
            skipped_rules.push(id);
            continue;
        }
        ctx.execute(rule)?;
    }

    let unknown_skipped_rules: Vec<String> = skip
        .iter()
        .filter(|id| !registry.contains(id))
        .cloned()
        .collect();
    for id in &unknown_skipped_rules {
        warn!(rule = %id, "unknown risk rule in skip list");
    }

    let AnalysisContext {
        model,
        tags,
        risks_by_category,
        categories,
    } = ctx;

    let mut risks: Vec<Risk> = risks_by_category.into_values().flatten().collect();
    let tracking = reconcile(&mut risks, &model.risk_tracking, options.ignore_orphaned_risk_tracking)?;
    sort_risks(&mut risks);

    let mut risks_by_category: BTreeMap<String, Vec<Risk>> = BTreeMap::new();
    for risk in &risks {
        risks_by_category
            .entry(risk.category.clone())
            .or_default()
            .push(risk.clone());
    }

    let mut categories: Vec<RiskCategory> = categories.into_values().collect();
    sort_categories(&mut categories, &risks_by_category);

    let mut synthetic_ids = BTreeMap::new();
    for (index, risk) in risks.iter().enumerate() {
        if synthetic_ids
            .insert(risk.synthetic_id.to_lowercase(), index)
            .is_some()
        {
            warn!(risk = %risk.synthetic_id, "synthetic risk id generated more than once");
        }
    }

    let statistics = RiskStatistics::from_risks(&risks);
    info!(
        risks = risks.len(),
        categories = risks_by_category.len(),
        "analysis finished"
    );

    Ok(AnalysisReport {
        model,
        categories,
        risks,
        risks_by_category,
        statistics,
        tracking,
        tags: tags.into_iter().collect(),
        skipped_rules,
        unknown_skipped_rules,
        synthetic_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackingError;
    use crate::tracking::RiskTracking;
    use crate::types::{
        Criticality, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction,
        RiskStatus, Stride,
    };
    use chrono::NaiveDate;

    struct FixedRule {
        id: &'static str,
        subjects: Vec<&'static str>,
    }

    fn category(id: &str) -> RiskCategory {
        RiskCategory {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            impact: String::new(),
            asvs: String::new(),
            cheat_sheet: String::new(),
            action: String::new(),
            mitigation: String::new(),
            check: String::new(),
            detection_logic: String::new(),
            risk_assessment: String::new(),
            false_positives: String::new(),
            function: RiskFunction::Architecture,
            stride: Stride::Tampering,
            model_failure_possible_reason: false,
            cwe: 0,
        }
    }

    impl RiskRule for FixedRule {
        fn category(&self) -> RiskCategory {
            category(self.id)
        }

        fn supported_tags(&self) -> Vec<String> {
            vec!["Fixed-Tag".to_string()]
        }

        fn generate_risks(&self, _ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
            Ok(self
                .subjects
                .iter()
                .map(|subject| {
                    Risk::new(
                        self.id,
                        RiskExploitationLikelihood::Likely,
                        RiskExploitationImpact::Medium,
                        format!("{} at {subject}", self.id),
                    )
                    .technical_asset(subject)
                    .with_composed_id()
                })
                .collect())
        }
    }

    struct ForeignRule;

    impl RiskRule for ForeignRule {
        fn category(&self) -> RiskCategory {
            category("mine")
        }

        fn generate_risks(&self, _ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
            Ok(vec![Risk::new(
                "theirs",
                RiskExploitationLikelihood::Likely,
                RiskExploitationImpact::Low,
                "x",
            )])
        }
    }

    fn model() -> ParsedModel {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ParsedModel::new("test", date, Criticality::Important)
    }

    fn registry(rules: Vec<Box<dyn RiskRule>>) -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        for rule in rules {
            registry.register(rule).unwrap();
        }
        registry
    }

    #[test]
    fn duplicate_category_is_rejected() {
        let mut registry = RuleRegistry::new();
        registry
            .register(Box::new(FixedRule { id: "a", subjects: vec![] }))
            .unwrap();
        let err = registry
            .register(Box::new(FixedRule { id: "a", subjects: vec![] }))
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateCategory(ref id) if id == "a"));
    }

    #[test]
    fn skipped_rules_do_not_run_and_unknown_skips_are_reported() {
        let registry = registry(vec![
            Box::new(FixedRule { id: "a", subjects: vec!["x"] }),
            Box::new(FixedRule { id: "b", subjects: vec!["y"] }),
        ]);
        let options = AnalysisOptions {
            skip_risk_rules: AnalysisOptions::skip_list(" b , nope,"),
            ignore_orphaned_risk_tracking: false,
        };
        let report = analyze(model(), registry, &options).unwrap();
        assert_eq!(report.risks.len(), 1);
        assert_eq!(report.risks[0].synthetic_id, "a@x");
        assert_eq!(report.skipped_rules, vec!["b"]);
        assert_eq!(report.unknown_skipped_rules, vec!["nope"]);
        assert!(report.tags.contains(&"fixed-tag".to_string()));
    }

    #[test]
    fn foreign_category_is_an_error() {
        let registry = registry(vec![Box::new(ForeignRule)]);
        let err = analyze(model(), registry, &AnalysisOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Engine(EngineError::Rule {
                source: RuleError::ForeignCategory { .. },
                ..
            })
        ));
    }

    #[test]
    fn tracking_is_applied_before_sorting() {
        let registry = registry(vec![Box::new(FixedRule {
            id: "a",
            subjects: vec!["x", "y"],
        })]);
        let mut model = model();
        model.risk_tracking.insert(
            "a@x".to_string(),
            RiskTracking {
                synthetic_risk_id: "a@x".to_string(),
                justification: "handled by WAF".to_string(),
                ticket: String::new(),
                checked_by: String::new(),
                status: RiskStatus::Mitigated,
                date: None,
            },
        );
        let report = analyze(model, registry, &AnalysisOptions::default()).unwrap();
        let ids: Vec<_> = report.risks.iter().map(|r| r.synthetic_id.as_str()).collect();
        assert_eq!(ids, vec!["a@y", "a@x"]);
        assert_eq!(report.risks[1].risk_status, RiskStatus::Mitigated);
        assert_eq!(report.tracking.applied.len(), 1);
        assert_eq!(
            report.risk("A@X").map(|risk| risk.risk_status),
            Some(RiskStatus::Mitigated)
        );
    }

    #[test]
    fn orphaned_tracking_aborts_unless_ignored() {
        let mut model = model();
        model.risk_tracking.insert(
            "some-rule@nonexistent-id".to_string(),
            RiskTracking {
                synthetic_risk_id: "some-rule@nonexistent-id".to_string(),
                justification: String::new(),
                ticket: String::new(),
                checked_by: String::new(),
                status: RiskStatus::Accepted,
                date: None,
            },
        );
        let rules = || registry(vec![Box::new(FixedRule { id: "a", subjects: vec!["x"] })]);

        let err = analyze(model.clone(), rules(), &AnalysisOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Tracking(TrackingError::OrphanedTracking(_))));

        let options = AnalysisOptions {
            ignore_orphaned_risk_tracking: true,
            ..AnalysisOptions::default()
        };
        let report = analyze(model, rules(), &options).unwrap();
        assert_eq!(report.tracking.orphans, vec!["some-rule@nonexistent-id"]);
    }

    #[test]
    fn categories_without_risks_are_listed_last() {
        let registry = registry(vec![
            Box::new(FixedRule { id: "empty", subjects: vec![] }),
            Box::new(FixedRule { id: "full", subjects: vec!["x"] }),
        ]);
        let report = analyze(model(), registry, &AnalysisOptions::default()).unwrap();
        let ids: Vec<_> = report.categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["full", "empty"]);
        assert_eq!(report.categories_with_risks().count(), 1);
    }
}
