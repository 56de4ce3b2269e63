use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::TechnicalAsset;
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    Authentication, Authorization, Confidentiality, Criticality, DataBreachProbability,
    RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride, TechnicalAssetType,
    Usage,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-identity-propagation",
    title: "Missing Identity Propagation",
    description: "Technical assets (especially multi-tenant systems), which usually process data for endusers should authorize every request based on the identity of the enduser when the data flow is authenticated (i.e. non-public). For DevOps usages at least a technical-user authorization is required.",
    impact: "If this risk is unmitigated, attackers might be able to access or modify foreign data after a successful compromise of a component within the system due to missing resource-based authorization checks.",
    asvs: "V4 - Access Control Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Access_Control_Cheat_Sheet.html",
    action: "Identity Propagation and Resource-based Authorization",
    mitigation: "When processing requests for endusers if possible authorize in the backend against the propagated identity of the enduser. This can be achieved in passing JWTs or similar tokens and checking them in the backend services. For DevOps usages apply at least a technical-user authorization.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope service-like technical assets which usually process data based on enduser requests, if authenticated (i.e. non-public), should authorize incoming requests based on the propagated enduser identity when their rating is sensitive. This is especially the case for all multi-tenant assets (there even less-sensitive rated ones). DevOps usages are exempted from this risk.",
    risk_assessment: "The risk rating (medium or high) depends on the confidentiality, integrity, and availability rating of the technical asset.",
    false_positives: "Technical assets which do not process requests regarding functionality or data linked to end-users (customers) can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 284,
};

pub struct MissingIdentityPropagation;

impl RiskRule for MissingIdentityPropagation {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model
            .in_scope_technical_assets()
            .filter(|asset| asset.technology.is_usually_processing_enduser_requests())
            .filter(|asset| needs_enduser_identity(asset))
        {
            let impact = if Rating::own(asset).is_top() {
                RiskExploitationImpact::Medium
            } else {
                RiskExploitationImpact::Low
            };
            for link in model.incoming_links(&asset.id) {
                let propagating = model.technical_asset(&link.source_id).map_or(false, |caller| {
                    caller
                        .technology
                        .is_usually_able_to_propagate_identity_to_outgoing_targets()
                        && caller.kind != TechnicalAssetType::Datastore
                });
                if !propagating
                    || link.authentication == Authentication::None
                    || link.authorization == Authorization::EnduserIdentityPropagation
                {
                    continue;
                }
                if link.usage == Usage::DevOps && link.authorization != Authorization::None {
                    continue;
                }
                let source_title = model
                    .technical_asset(&link.source_id)
                    .map_or(link.source_id.as_str(), |caller| caller.title.as_str());
                risks.push(
                    Risk::new(
                        INFO.id,
                        RiskExploitationLikelihood::Unlikely,
                        impact,
                        format!(
                            "Missing Enduser Identity Propagation over communication link {} from {} to {}",
                            link.title, source_title, asset.title
                        ),
                    )
                    .technical_asset(&asset.id)
                    .communication_link(&link.id)
                    .breach(DataBreachProbability::Improbable, vec![asset.id.clone()])
                    .identified_by(&[&link.id, &link.source_id, &asset.id]),
                );
            }
        }
        Ok(risks)
    }
}

fn needs_enduser_identity(asset: &TechnicalAsset) -> bool {
    Rating::own(asset).is_high()
        || (asset.multi_tenant
            && (asset.confidentiality >= Confidentiality::Restricted
                || asset.integrity >= Criticality::Important
                || asset.availability >= Criticality::Important))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use crate::rules::testing::{asset, ids, link, run, Fixture};
    use crate::technology::Technology;

    #[test]
    fn technical_user_on_multi_tenant_service() {
        let mut orders = asset("orders", Technology::WebServiceRest);
        orders.multi_tenant = true;
        orders.integrity = Criticality::Important;
        let mut call = link("portal", "Orders API", "orders", Protocol::Https);
        call.authentication = Authentication::Token;
        call.authorization = Authorization::TechnicalUser;
        let mut propagated = link("shop", "Orders API", "orders", Protocol::Https);
        propagated.authentication = Authentication::Token;
        propagated.authorization = Authorization::EnduserIdentityPropagation;
        let mut deploy = link("ci", "Deploy", "orders", Protocol::Ssh);
        deploy.authentication = Authentication::ClientCertificate;
        deploy.authorization = Authorization::TechnicalUser;
        deploy.usage = Usage::DevOps;

        let model = Fixture::new()
            .asset(orders)
            .asset(asset("portal", Technology::WebApplication))
            .asset(asset("shop", Technology::WebApplication))
            .asset(asset("ci", Technology::DevOpsClient))
            .link(call)
            .link(propagated)
            .link(deploy)
            .build();

        let risks = run(&MissingIdentityPropagation, model);
        assert_eq!(
            ids(&risks),
            vec!["missing-identity-propagation@portal>orders-api@portal@orders"]
        );
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Low);
    }
}
