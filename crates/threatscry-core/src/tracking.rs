use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::TrackingError;
use crate::risk::Risk;
use crate::types::RiskStatus;

/// A recorded human disposition for one risk id or a `*` pattern of ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskTracking {
    pub synthetic_risk_id: String,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub ticket: String,
    #[serde(default)]
    pub checked_by: String,
    pub status: RiskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl RiskTracking {
    pub fn is_wildcard(&self) -> bool {
        self.synthetic_risk_id.contains('*')
    }
}

/// What reconciliation did, for reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingOutcome {
    /// Risk ids that received a disposition, with the tracking key that supplied it.
    pub applied: BTreeMap<String, String>,
    /// Tracking keys that matched nothing (only filled when orphans are ignored).
    pub orphans: Vec<String>,
}

/// Compile a tracking pattern: each `*` matches exactly one `@`-delimited segment.
pub fn wildcard_regex(pattern: &str) -> Result<Regex, TrackingError> {
    let escaped = regex::escape(pattern).replace(r"\*", "[^@]+");
    Regex::new(&format!("^{escaped}$")).map_err(|source| TrackingError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Apply tracking records to freshly generated risks.
///
/// Exact ids are applied first. Wildcard patterns are then evaluated in sorted
/// order against ids without an exact record; when several patterns match the
/// same id the first one wins. A record that matches no risk is an orphan,
/// fatal unless `ignore_orphans` is set.
pub fn reconcile(
    risks: &mut [Risk],
    tracking: &BTreeMap<String, RiskTracking>,
    ignore_orphans: bool,
) -> Result<TrackingOutcome, TrackingError> {
    info!("executing risk tracking evaluation");
    let risk_ids: BTreeSet<String> = risks
        .iter()
        .map(|risk| risk.synthetic_id.to_lowercase())
        .collect();

    let mut outcome = TrackingOutcome::default();
    let mut dispositions: BTreeMap<String, &RiskTracking> = BTreeMap::new();

    let (wildcards, direct): (Vec<_>, Vec<_>) = tracking
        .iter()
        .map(|(key, record)| (key.to_lowercase(), record))
        .partition(|(_, record)| record.is_wildcard());
    let direct_ids: BTreeSet<String> = direct.iter().map(|(key, _)| key.clone()).collect();

    for (key, record) in &direct {
        if risk_ids.contains(key) {
            dispositions.insert(key.clone(), *record);
            outcome.applied.insert(key.clone(), key.clone());
        } else {
            orphan(&mut outcome, key, ignore_orphans, TrackingError::OrphanedTracking)?;
        }
    }

    for (pattern, record) in &wildcards {
        info!(pattern = %pattern, "applying wildcard risk tracking");
        let expression = wildcard_regex(pattern)?;
        let mut matched = false;
        for id in risk_ids.iter().filter(|id| !direct_ids.contains(*id)) {
            if expression.is_match(id) {
                matched = true;
                if !dispositions.contains_key(id) {
                    debug!(risk = %id, "matched by wildcard");
                    dispositions.insert(id.clone(), *record);
                    outcome.applied.insert(id.clone(), pattern.clone());
                }
            }
        }
        if !matched {
            orphan(&mut outcome, pattern, ignore_orphans, TrackingError::OrphanedWildcard)?;
        }
    }

    for risk in risks.iter_mut() {
        risk.risk_status = dispositions
            .get(&risk.synthetic_id.to_lowercase())
            .map_or(RiskStatus::Unchecked, |record| record.status);
    }
    Ok(outcome)
}

fn orphan(
    outcome: &mut TrackingOutcome,
    key: &str,
    ignore_orphans: bool,
    error: fn(String) -> TrackingError,
) -> Result<(), TrackingError> {
    if !ignore_orphans {
        return Err(error(key.to_string()));
    }
    warn!("{}", error(key.to_string()));
    outcome.orphans.push(key.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RiskExploitationImpact, RiskExploitationLikelihood};

    fn risk(id: &str) -> Risk {
        let mut risk = Risk::new(
            "rule-x",
            RiskExploitationLikelihood::Likely,
            RiskExploitationImpact::Medium,
            id,
        );
        risk.synthetic_id = id.to_string();
        risk
    }

    fn record(id: &str, status: RiskStatus) -> (String, RiskTracking) {
        (
            id.to_lowercase(),
            RiskTracking {
                synthetic_risk_id: id.to_string(),
                justification: String::new(),
                ticket: String::new(),
                checked_by: String::new(),
                status,
                date: None,
            },
        )
    }

    #[test]
    fn wildcard_stays_within_one_segment() {
        let expression = wildcard_regex("rule-x@*").unwrap();
        assert!(expression.is_match("rule-x@assetA"));
        assert!(!expression.is_match("rule-x@assetA@assetB"));
        assert!(!expression.is_match("other@rule-x@assetA"));
    }

    #[test]
    fn wildcard_escapes_regex_metacharacters() {
        let expression = wildcard_regex("rule.x@a>b@*").unwrap();
        assert!(expression.is_match("rule.x@a>b@c"));
        assert!(!expression.is_match("rulexx@a>b@c"));
    }

    #[test]
    fn exact_tracking_wins_over_wildcard() {
        let mut risks = vec![risk("rule-x@a"), risk("rule-x@b"), risk("rule-x@a@b")];
        let tracking = BTreeMap::from([
            record("rule-x@*", RiskStatus::Accepted),
            record("rule-x@a", RiskStatus::Mitigated),
        ]);
        let outcome = reconcile(&mut risks, &tracking, false).unwrap();
        assert_eq!(risks[0].risk_status, RiskStatus::Mitigated);
        assert_eq!(risks[1].risk_status, RiskStatus::Accepted);
        assert_eq!(risks[2].risk_status, RiskStatus::Unchecked);
        assert_eq!(outcome.applied.get("rule-x@b").map(String::as_str), Some("rule-x@*"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut risks = vec![risk("Rule-X@AssetA")];
        let tracking = BTreeMap::from([record("rule-x@asseta", RiskStatus::FalsePositive)]);
        reconcile(&mut risks, &tracking, false).unwrap();
        assert_eq!(risks[0].risk_status, RiskStatus::FalsePositive);
    }

    #[test]
    fn orphaned_exact_id_is_fatal_by_default() {
        let mut risks = vec![risk("rule-x@a")];
        let tracking = BTreeMap::from([record("some-rule@nonexistent-id", RiskStatus::Accepted)]);
        let err = reconcile(&mut risks, &tracking, false).unwrap_err();
        assert!(matches!(err, TrackingError::OrphanedTracking(ref id) if id == "some-rule@nonexistent-id"));
    }

    #[test]
    fn orphans_are_reported_when_ignored() {
        let mut risks = vec![risk("rule-x@a")];
        let tracking = BTreeMap::from([
            record("some-rule@nonexistent-id", RiskStatus::Accepted),
            record("other@*", RiskStatus::Accepted),
        ]);
        let outcome = reconcile(&mut risks, &tracking, true).unwrap();
        assert_eq!(outcome.orphans, vec!["some-rule@nonexistent-id", "other@*"]);
        assert_eq!(risks[0].risk_status, RiskStatus::Unchecked);
    }

    #[test]
    fn orphaned_wildcard_is_fatal_by_default() {
        let mut risks = vec![risk("rule-x@a@b")];
        let tracking = BTreeMap::from([record("rule-x@*", RiskStatus::Accepted)]);
        let err = reconcile(&mut risks, &tracking, false).unwrap_err();
        assert!(matches!(err, TrackingError::OrphanedWildcard(_)));
    }
}
