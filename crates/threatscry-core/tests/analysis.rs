use std::path::{Path, PathBuf};

use threatscry_core::types::{RiskSeverity, RiskStatus};
use threatscry_core::{
    analyze, load_model_file, parse_model, AnalysisError, AnalysisOptions, ModelError, ParsedModel,
    RuleRegistry, TrackingError,
};

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/shop.yaml")
}

fn shop() -> ParsedModel {
    load_model_file(&fixture()).unwrap()
}

fn fixture_text() -> String {
    std::fs::read_to_string(fixture()).unwrap()
}

#[test]
fn strictly_confidential_database_without_encryption() {
    let report = analyze(shop(), RuleRegistry::builtin(), &AnalysisOptions::default()).unwrap();
    let risk = report.risk("unencrypted-asset@db1").unwrap();
    assert_eq!(risk.severity, RiskSeverity::Medium);
    assert_eq!(risk.risk_status, RiskStatus::InProgress);
    assert_eq!(risk.most_relevant_technical_asset.as_deref(), Some("db1"));
}

#[test]
fn ldap_query_is_identified_by_caller_server_and_link() {
    let report = analyze(shop(), RuleRegistry::builtin(), &AnalysisOptions::default()).unwrap();
    let risk = report
        .risk("ldap-injection@client1@ldap1@client1>ldap-query")
        .unwrap();
    assert_eq!(risk.category, "ldap-injection");
    assert_eq!(risk.data_breach_technical_assets, vec!["ldap1"]);
}

#[test]
fn wildcard_tracking_and_individual_risks_are_applied() {
    let report = analyze(shop(), RuleRegistry::builtin(), &AnalysisOptions::default()).unwrap();
    let xxe = report.risk("xml-external-entity@backend").unwrap();
    assert_eq!(xxe.risk_status, RiskStatus::Mitigated);
    assert_eq!(
        report
            .tracking
            .applied
            .get("xml-external-entity@backend")
            .map(String::as_str),
        Some("xml-external-entity@*")
    );

    let individual = report.risk("vendor-lock-in@db1").unwrap();
    assert_eq!(individual.severity, RiskSeverity::Low);
    assert_eq!(individual.risk_status, RiskStatus::Unchecked);
}

#[test]
fn every_risk_belongs_to_a_listed_category() {
    let report = analyze(shop(), RuleRegistry::builtin(), &AnalysisOptions::default()).unwrap();
    assert_eq!(report.categories.len(), 43);
    for risk in &report.risks {
        assert!(report.categories.iter().any(|category| category.id == risk.category));
        assert!(risk.synthetic_id.starts_with(&format!("{}@", risk.category)));
    }
    let total: usize = report
        .statistics
        .risks
        .values()
        .flat_map(|row| row.values())
        .sum();
    assert_eq!(total, report.risks.len());
}

#[test]
fn repeated_runs_are_identical() {
    let first = analyze(shop(), RuleRegistry::builtin(), &AnalysisOptions::default()).unwrap();
    let second = analyze(shop(), RuleRegistry::builtin(), &AnalysisOptions::default()).unwrap();
    assert_eq!(
        serde_json::to_string(&first.risks).unwrap(),
        serde_json::to_string(&second.risks).unwrap()
    );
}

#[test]
fn unrelated_asset_keeps_existing_ids() {
    let before = analyze(shop(), RuleRegistry::builtin(), &AnalysisOptions::default()).unwrap();

    let extended = fixture_text().replace(
        "trust_boundaries:",
        r#"  Batch Reporting:
    id: reporting
    type: process
    usage: devops
    size: component
    technology: report-engine
    machine: virtual
    encryption: none
    confidentiality: public
    integrity: archive
    availability: archive
trust_boundaries:"#,
    );
    let after = analyze(
        parse_model(&extended).unwrap(),
        RuleRegistry::builtin(),
        &AnalysisOptions::default(),
    )
    .unwrap();

    let after_ids: Vec<&str> = after.risks.iter().map(|risk| risk.synthetic_id.as_str()).collect();
    for risk in before
        .risks
        .iter()
        .filter(|risk| !risk.synthetic_id.contains("reporting"))
        .filter(|risk| !risk.data_breach_technical_assets.contains(&"reporting".to_string()))
    {
        assert!(
            after_ids.contains(&risk.synthetic_id.as_str()),
            "{} disappeared",
            risk.synthetic_id
        );
    }
}

#[test]
fn duplicate_asset_id_fails_before_any_rule_runs() {
    let text = fixture_text()
        .replace("id: backend", "id: svc")
        .replace("id: db1", "id: svc");
    let err = parse_model(&text).unwrap_err();
    assert!(matches!(err, ModelError::DuplicateId(ref id) if id == "svc"));
}

#[test]
fn orphaned_tracking_is_fatal_unless_ignored() {
    let text = fixture_text().replace(
        "risk_tracking:",
        "risk_tracking:\n  some-rule@nonexistent-id:\n    status: accepted",
    );

    let err = analyze(
        parse_model(&text).unwrap(),
        RuleRegistry::builtin(),
        &AnalysisOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Tracking(TrackingError::OrphanedTracking(ref id)) if id == "some-rule@nonexistent-id"
    ));

    let options = AnalysisOptions {
        ignore_orphaned_risk_tracking: true,
        ..AnalysisOptions::default()
    };
    let report = analyze(parse_model(&text).unwrap(), RuleRegistry::builtin(), &options).unwrap();
    assert_eq!(report.tracking.orphans, vec!["some-rule@nonexistent-id"]);
}

#[test]
fn skipped_rules_produce_no_risks() {
    let options = AnalysisOptions {
        skip_risk_rules: AnalysisOptions::skip_list("ldap-injection, unencrypted-asset"),
        ignore_orphaned_risk_tracking: true,
    };
    let report = analyze(shop(), RuleRegistry::builtin(), &options).unwrap();
    assert!(report.risks.iter().all(|risk| risk.category != "ldap-injection"));
    assert!(report.risk("unencrypted-asset@db1").is_none());
    assert_eq!(report.tracking.orphans, vec!["unencrypted-asset@db1"]);
}

#[test]
fn parsed_model_survives_json_round_trip() {
    let model = shop();
    let json = serde_json::to_string(&model).unwrap();
    let restored = ParsedModel::from_json(&json).unwrap();
    assert_eq!(restored.incoming_links("ldap1").len(), 1);
    assert_eq!(restored, model);
}
