use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, ParsedModel, TechnicalAsset};
use crate::protocol::Protocol;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    Confidentiality, Criticality, DataBreachProbability, RiskExploitationImpact,
    RiskExploitationLikelihood, RiskFunction, Stride, TechnicalAssetType, Usage,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "unguarded-direct-datastore-access",
    title: "Unguarded Direct Datastore Access",
    description: "Datastores accessed across trust boundaries must be guarded by some protecting service or application.",
    impact: "If this risk is unmitigated, attackers might be able to directly attack sensitive datastores without any protecting components in-between.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Encapsulation of Datastore",
    mitigation: "Encapsulate the datastore access behind a guarding service or application.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope technical assets of type datastore (except identity-store-ldap when accessed from identity-provider and file-server when accessed via file transfer protocols) with confidentiality rating of confidential (or higher) or with integrity rating of critical (or higher) which have incoming data-flows from assets outside across a network trust-boundary. DevOps config and deployment access is excluded from this risk.",
    risk_assessment: "The matching technical assets are at low risk. When either the confidentiality rating is strictly-confidential or the integrity rating is mission-critical, the risk-rating is considered medium. For assets with RAA values higher than 40 % the risk-rating increases.",
    false_positives: "When the caller is considered fully trusted as if it was part of the datastore itself.",
    model_failure_possible_reason: false,
    cwe: 501,
};

const RAA_LIMIT: f64 = 40.0;

pub struct UnguardedDirectDatastoreAccess;

impl RiskRule for UnguardedDirectDatastoreAccess {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for datastore in model
            .in_scope_technical_assets()
            .filter(|asset| asset.kind == TechnicalAssetType::Datastore)
            .filter(|asset| {
                asset.confidentiality >= Confidentiality::Confidential
                    || asset.integrity >= Criticality::Critical
            })
        {
            for link in model.incoming_links(&datastore.id) {
                let Some(source) = model.technical_asset(&link.source_id) else {
                    continue;
                };
                if is_unguarded(model, datastore, source, link) {
                    risks.push(risk(datastore, source, link));
                }
            }
        }
        Ok(risks)
    }
}

fn is_unguarded(
    model: &ParsedModel,
    datastore: &TechnicalAsset,
    source: &TechnicalAsset,
    link: &CommunicationLink,
) -> bool {
    if datastore.technology.is_identity_store() && source.technology == Technology::IdentityProvider {
        return false;
    }
    let file_transfer = datastore.technology == Technology::FileServer
        && matches!(link.protocol, Protocol::Ftp | Protocol::Ftps | Protocol::Sftp);
    link.is_across_trust_boundary_network_only(model)
        && !file_transfer
        && link.usage != Usage::DevOps
        && !model.is_sharing_same_parent_trust_boundary(&datastore.id, &source.id)
}

fn risk(datastore: &TechnicalAsset, source: &TechnicalAsset, link: &CommunicationLink) -> Risk {
    let impact = if datastore.confidentiality == Confidentiality::StrictlyConfidential
        || datastore.integrity == Criticality::MissionCritical
        || datastore.raa > RAA_LIMIT
    {
        RiskExploitationImpact::Medium
    } else {
        RiskExploitationImpact::Low
    };
    Risk::new(
        INFO.id,
        RiskExploitationLikelihood::Likely,
        impact,
        format!(
            "Unguarded Direct Datastore Access of {} by {} via {}",
            datastore.title, source.title, link.title
        ),
    )
    .technical_asset(&datastore.id)
    .communication_link(&link.id)
    .breach(DataBreachProbability::Improbable, vec![datastore.id.clone()])
    .identified_by(&[&link.id, &source.id, &datastore.id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, boundary, ids, link, run, Fixture};
    use crate::types::TrustBoundaryType;

    fn datastore(id: &str, technology: Technology) -> TechnicalAsset {
        let mut store = asset(id, technology);
        store.kind = TechnicalAssetType::Datastore;
        store.confidentiality = Confidentiality::Confidential;
        store
    }

    #[test]
    fn direct_access_from_other_network() {
        let mut migrate = link("laptop", "Migrate", "db", Protocol::Jdbc);
        migrate.usage = Usage::DevOps;
        let model = Fixture::new()
            .asset(datastore("db", Technology::Database))
            .asset(datastore("users", Technology::IdentityStoreLdap))
            .asset(asset("reporting", Technology::ReportEngine))
            .asset(asset("laptop", Technology::DevOpsClient))
            .asset(asset("idp", Technology::IdentityProvider))
            .link(link("reporting", "Query", "db", Protocol::Jdbc))
            .link(migrate)
            .link(link("idp", "Lookup", "users", Protocol::Ldaps))
            .boundary(boundary("data", TrustBoundaryType::NetworkOnPrem, &["db", "users"]))
            .build();

        let risks = run(&UnguardedDirectDatastoreAccess, model);
        assert_eq!(
            ids(&risks),
            vec!["unguarded-direct-datastore-access@reporting>query@reporting@db"]
        );
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Low);
    }
}
