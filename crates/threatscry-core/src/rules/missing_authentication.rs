use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, ParsedModel, TechnicalAsset};
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Authentication, Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride, TechnicalAssetType,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-authentication",
    title: "Missing Authentication",
    description: "Technical assets (especially multi-tenant systems) should authenticate incoming requests when the asset processes or stores sensitive data.",
    impact: "If this risk is unmitigated, attackers might be able to access or modify sensitive data in an unauthenticated way.",
    asvs: "V2 - Authentication Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Authentication_Cheat_Sheet.html",
    action: "Authentication of Incoming Requests",
    mitigation: "Apply an authentication method to the technical asset. To protect highly sensitive data consider the use of two-factor authentication for human users.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope technical assets (except load-balancer, reverse-proxy, service-registry, waf, ids, and ips and in-process calls) should authenticate incoming requests when the asset processes or stores sensitive data. This is especially the case for all multi-tenant assets (there even non-sensitive ones).",
    risk_assessment: "The risk rating (medium or high) depends on the sensitivity of the data sent across the communication link. Monitoring callers are exempted from this risk.",
    false_positives: "Technical assets which do not process requests regarding functionality or data linked to end-users (customers) can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 306,
};

pub struct MissingAuthentication;

impl RiskRule for MissingAuthentication {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model.in_scope_technical_assets() {
            if matches!(
                asset.technology,
                Technology::LoadBalancer
                    | Technology::ReverseProxy
                    | Technology::ServiceRegistry
                    | Technology::Waf
                    | Technology::Ids
                    | Technology::Ips
            ) || !needs_authentication(model, asset)
            {
                continue;
            }
            for link in model.incoming_links(&asset.id) {
                if !is_authenticating_caller(model, link) {
                    continue;
                }
                if link.authentication != Authentication::None || link.protocol.is_process_local() {
                    continue;
                }
                let confidentiality = link.highest_confidentiality(model);
                let integrity = link.highest_integrity(model);
                let impact = if confidentiality == Confidentiality::StrictlyConfidential
                    || integrity == Criticality::MissionCritical
                {
                    RiskExploitationImpact::High
                } else if confidentiality <= Confidentiality::Internal
                    && integrity == Criticality::Operational
                {
                    RiskExploitationImpact::Low
                } else {
                    RiskExploitationImpact::Medium
                };
                risks.push(authentication_risk(
                    model,
                    INFO.id,
                    asset,
                    AccessPath::direct(link),
                    impact,
                    RiskExploitationLikelihood::Likely,
                    false,
                ));
            }
        }
        Ok(risks)
    }
}

/// Sensitive or multi-tenant assets are expected to authenticate their callers.
pub(crate) fn needs_authentication(model: &ParsedModel, asset: &TechnicalAsset) -> bool {
    Rating::of_asset(asset, model).is_high() || asset.multi_tenant
}

/// Callers which are expected to authenticate: not monitoring-like and not datastores.
pub(crate) fn is_authenticating_caller(model: &ParsedModel, link: &CommunicationLink) -> bool {
    model.technical_asset(&link.source_id).map_or(false, |caller| {
        !caller.technology.is_unprotected_comms_tolerated() && caller.kind != TechnicalAssetType::Datastore
    })
}

/// The link reaching the asset, and where the access originally came from.
pub(crate) struct AccessPath<'a> {
    pub link: &'a CommunicationLink,
    pub origin: &'a CommunicationLink,
    pub hop: Option<&'a str>,
}

impl<'a> AccessPath<'a> {
    pub(crate) fn direct(link: &'a CommunicationLink) -> Self {
        AccessPath {
            link,
            origin: link,
            hop: None,
        }
    }
}

pub(crate) fn authentication_risk(
    model: &ParsedModel,
    category: &str,
    asset: &TechnicalAsset,
    path: AccessPath<'_>,
    impact: RiskExploitationImpact,
    likelihood: RiskExploitationLikelihood,
    two_factor: bool,
) -> Risk {
    let title_of = |id: &str| {
        model
            .technical_asset(id)
            .map_or_else(|| id.to_string(), |asset| asset.title.clone())
    };
    let factor = if two_factor { "Two-Factor " } else { "" };
    let hop = path
        .hop
        .map(|hop| format!("forwarded via {hop} "))
        .unwrap_or_default();
    let title = format!(
        "Missing {factor}Authentication covering communication link {} from {} {hop}to {}",
        path.link.title,
        title_of(&path.origin.source_id),
        asset.title
    );
    Risk::new(category, likelihood, impact, title)
        .technical_asset(&asset.id)
        .communication_link(&path.link.id)
        .breach(DataBreachProbability::Possible, vec![asset.id.clone()])
        .identified_by(&[&path.link.id, &path.link.source_id, &asset.id])
}
