use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::severity::calculate_severity;
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction,
    RiskSeverity, RiskStatus, Stride,
};

/// Static metadata of a risk rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskCategory {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub asvs: String,
    #[serde(default)]
    pub cheat_sheet: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub mitigation: String,
    #[serde(default)]
    pub check: String,
    #[serde(default)]
    pub detection_logic: String,
    #[serde(default)]
    pub risk_assessment: String,
    #[serde(default)]
    pub false_positives: String,
    pub function: RiskFunction,
    pub stride: Stride,
    #[serde(default)]
    pub model_failure_possible_reason: bool,
    #[serde(default)]
    pub cwe: u32,
}

/// One concrete finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Risk {
    pub category: String,
    #[serde(default)]
    pub risk_status: RiskStatus,
    pub severity: RiskSeverity,
    pub exploitation_likelihood: RiskExploitationLikelihood,
    pub exploitation_impact: RiskExploitationImpact,
    pub title: String,
    #[serde(default)]
    pub synthetic_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_relevant_data_asset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_relevant_technical_asset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_relevant_communication_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_relevant_trust_boundary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_relevant_shared_runtime: Option<String>,
    pub data_breach_probability: DataBreachProbability,
    #[serde(default)]
    pub data_breach_technical_assets: Vec<String>,
}

impl Risk {
    /// A risk with severity derived from likelihood and impact.
    pub fn new(
        category: &str,
        likelihood: RiskExploitationLikelihood,
        impact: RiskExploitationImpact,
        title: impl Into<String>,
    ) -> Self {
        Risk {
            category: category.to_string(),
            risk_status: RiskStatus::Unchecked,
            severity: calculate_severity(likelihood, impact),
            exploitation_likelihood: likelihood,
            exploitation_impact: impact,
            title: title.into(),
            synthetic_id: String::new(),
            most_relevant_data_asset: None,
            most_relevant_technical_asset: None,
            most_relevant_communication_link: None,
            most_relevant_trust_boundary: None,
            most_relevant_shared_runtime: None,
            data_breach_probability: DataBreachProbability::Improbable,
            data_breach_technical_assets: Vec::new(),
        }
    }

    pub fn technical_asset(mut self, id: &str) -> Self {
        self.most_relevant_technical_asset = Some(id.to_string());
        self
    }

    pub fn communication_link(mut self, id: &str) -> Self {
        self.most_relevant_communication_link = Some(id.to_string());
        self
    }

    pub fn trust_boundary(mut self, id: &str) -> Self {
        self.most_relevant_trust_boundary = Some(id.to_string());
        self
    }

    pub fn shared_runtime(mut self, id: &str) -> Self {
        self.most_relevant_shared_runtime = Some(id.to_string());
        self
    }

    pub fn data_asset(mut self, id: &str) -> Self {
        self.most_relevant_data_asset = Some(id.to_string());
        self
    }

    pub fn breach(mut self, probability: DataBreachProbability, assets: Vec<String>) -> Self {
        self.data_breach_probability = probability;
        self.data_breach_technical_assets = assets;
        self
    }

    /// Synthetic id from the category followed by the given element ids.
    pub fn identified_by(mut self, ids: &[&str]) -> Self {
        let mut id = self.category.clone();
        for part in ids {
            id.push('@');
            id.push_str(part);
        }
        self.synthetic_id = id;
        self
    }

    /// Synthetic id composed from the "most relevant" references in fixed order:
    /// technical asset, communication link, trust boundary, shared runtime, data asset.
    pub fn composed_synthetic_id(&self) -> String {
        let mut id = self.category.clone();
        for part in [
            &self.most_relevant_technical_asset,
            &self.most_relevant_communication_link,
            &self.most_relevant_trust_boundary,
            &self.most_relevant_shared_runtime,
            &self.most_relevant_data_asset,
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        {
            id.push('@');
            id.push_str(part);
        }
        id
    }

    pub fn with_composed_id(mut self) -> Self {
        self.synthetic_id = self.composed_synthetic_id();
        self
    }
}

// --- Ordering ---

/// Severity desc, status asc, impact desc, likelihood desc, title asc, then synthetic id.
pub fn compare_risks(a: &Risk, b: &Risk) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| a.risk_status.cmp(&b.risk_status))
        .then_with(|| b.exploitation_impact.cmp(&a.exploitation_impact))
        .then_with(|| b.exploitation_likelihood.cmp(&a.exploitation_likelihood))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.synthetic_id.cmp(&b.synthetic_id))
}

pub fn sort_risks(risks: &mut [Risk]) {
    risks.sort_by(compare_risks);
}

/// Highest severity among risks still at risk, if any.
pub fn highest_open_severity(risks: &[Risk]) -> Option<RiskSeverity> {
    risks
        .iter()
        .filter(|risk| risk.risk_status.is_still_at_risk())
        .map(|risk| risk.severity)
        .max()
}

/// Categories ordered by highest open severity (fully closed ones last), then title.
pub fn sort_categories(categories: &mut [RiskCategory], risks_by_category: &BTreeMap<String, Vec<Risk>>) {
    let open = |category: &RiskCategory| {
        risks_by_category
            .get(&category.id)
            .and_then(|risks| highest_open_severity(risks))
    };
    categories.sort_by(|a, b| {
        open(b)
            .cmp(&open(a))
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    });
}

// --- Statistics ---

/// Count of risks per severity and status, every cell present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskStatistics {
    pub risks: BTreeMap<String, BTreeMap<String, usize>>,
}

impl RiskStatistics {
    pub fn from_risks<'a>(risks: impl IntoIterator<Item = &'a Risk>) -> Self {
        let mut table: BTreeMap<String, BTreeMap<String, usize>> = RiskSeverity::ALL
            .iter()
            .map(|severity| {
                let row = RiskStatus::ALL
                    .iter()
                    .map(|status| (status.as_str().to_string(), 0))
                    .collect();
                (severity.as_str().to_string(), row)
            })
            .collect();
        for risk in risks {
            if let Some(count) = table
                .get_mut(risk.severity.as_str())
                .and_then(|row| row.get_mut(risk.risk_status.as_str()))
            {
                *count += 1;
            }
        }
        RiskStatistics { risks: table }
    }

    pub fn count(&self, severity: RiskSeverity, status: RiskStatus) -> usize {
        self.risks
            .get(severity.as_str())
            .and_then(|row| row.get(status.as_str()))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RiskExploitationImpact as I;
    use RiskExploitationLikelihood as L;

    #[test]
    fn identified_by_joins_with_at() {
        let risk = Risk::new("ldap-injection", L::Likely, I::High, "x")
            .identified_by(&["client1", "ldap1", "client1>ldap-query"]);
        assert_eq!(risk.synthetic_id, "ldap-injection@client1@ldap1@client1>ldap-query");
        assert_eq!(risk.severity, RiskSeverity::Elevated);
    }

    #[test]
    fn composed_id_uses_fixed_segment_order() {
        let risk = Risk::new("custom", L::Likely, I::Medium, "x")
            .data_asset("customer-data")
            .shared_runtime("k8s")
            .technical_asset("app")
            .with_composed_id();
        assert_eq!(risk.synthetic_id, "custom@app@k8s@customer-data");
    }

    #[test]
    fn risks_sort_by_severity_then_status() {
        let mut risks = vec![
            Risk::new("a", L::Unlikely, I::Low, "low"),
            Risk::new("a", L::Frequent, I::VeryHigh, "critical"),
            Risk::new("a", L::Likely, I::Medium, "elevated-accepted"),
            Risk::new("a", L::Likely, I::Medium, "elevated-open"),
        ];
        risks[2].risk_status = RiskStatus::Accepted;
        sort_risks(&mut risks);
        let titles: Vec<_> = risks.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["critical", "elevated-open", "elevated-accepted", "low"]);
    }

    #[test]
    fn statistics_have_every_cell() {
        let mut mitigated = Risk::new("a", L::Likely, I::Medium, "m");
        mitigated.risk_status = RiskStatus::Mitigated;
        let risks = vec![Risk::new("a", L::Likely, I::Medium, "x"), mitigated];
        let stats = RiskStatistics::from_risks(&risks);
        assert_eq!(stats.risks.len(), 5);
        assert!(stats.risks.values().all(|row| row.len() == 6));
        assert_eq!(stats.count(RiskSeverity::Elevated, RiskStatus::Unchecked), 1);
        assert_eq!(stats.count(RiskSeverity::Elevated, RiskStatus::Mitigated), 1);
        assert_eq!(stats.count(RiskSeverity::Critical, RiskStatus::Unchecked), 0);
    }
}
