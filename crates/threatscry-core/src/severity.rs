use crate::types::{RiskExploitationImpact, RiskExploitationLikelihood, RiskSeverity};

/// Severity from the product of likelihood and impact weights.
pub fn calculate_severity(
    likelihood: RiskExploitationLikelihood,
    impact: RiskExploitationImpact,
) -> RiskSeverity {
    match likelihood.weight() * impact.weight() {
        0..=1 => RiskSeverity::Low,
        2..=3 => RiskSeverity::Medium,
        4..=8 => RiskSeverity::Elevated,
        9..=12 => RiskSeverity::High,
        _ => RiskSeverity::Critical,
    }
}
