//! Built-in risk rules.
//!
//! Every rule is a unit struct implementing [`RiskRule`]. Rules only read the
//! model; thresholds are kept literal in each rule since they differ slightly
//! from rule to rule.

use std::collections::BTreeSet;

use crate::engine::RiskRule;
use crate::model::{CommunicationLink, ParsedModel, SharedRuntime, TechnicalAsset, TrustBoundary};
use crate::risk::{Risk, RiskCategory};
use crate::types::{Confidentiality, Criticality, RiskFunction, Stride};

mod accidental_secret_leak;
mod code_backdooring;
mod container_baseimage_backdooring;
mod container_platform_escape;
mod cross_site_request_forgery;
mod cross_site_scripting;
mod dos_risky_access_across_trust_boundary;
mod incomplete_model;
mod ldap_injection;
mod missing_authentication;
mod missing_authentication_second_factor;
mod missing_build_infrastructure;
mod missing_cloud_hardening;
mod missing_file_validation;
mod missing_hardening;
mod missing_identity_propagation;
mod missing_identity_provider_isolation;
mod missing_identity_store;
mod missing_network_segmentation;
mod missing_vault;
mod missing_vault_isolation;
mod missing_waf;
mod mixed_targets_on_shared_runtime;
mod path_traversal;
mod push_instead_of_pull_deployment;
mod search_query_injection;
mod server_side_request_forgery;
mod service_registry_poisoning;
mod sql_nosql_injection;
mod unchecked_deployment;
mod unencrypted_asset;
mod unencrypted_communication;
mod unguarded_access_from_internet;
mod unguarded_direct_datastore_access;
mod unnecessary_communication_link;
mod unnecessary_data_asset;
mod unnecessary_data_transfer;
mod unnecessary_technical_asset;
mod untrusted_deserialization;
mod wrong_communication_link_content;
mod wrong_trust_boundary_content;
mod xml_external_entity;

pub use accidental_secret_leak::AccidentalSecretLeak;
pub use code_backdooring::CodeBackdooring;
pub use container_baseimage_backdooring::ContainerBaseImageBackdooring;
pub use container_platform_escape::ContainerPlatformEscape;
pub use cross_site_request_forgery::CrossSiteRequestForgery;
pub use cross_site_scripting::CrossSiteScripting;
pub use dos_risky_access_across_trust_boundary::DosRiskyAccessAcrossTrustBoundary;
pub use incomplete_model::IncompleteModel;
pub use ldap_injection::LdapInjection;
pub use missing_authentication::MissingAuthentication;
pub use missing_authentication_second_factor::MissingAuthenticationSecondFactor;
pub use missing_build_infrastructure::MissingBuildInfrastructure;
pub use missing_cloud_hardening::MissingCloudHardening;
pub use missing_file_validation::MissingFileValidation;
pub use missing_hardening::MissingHardening;
pub use missing_identity_propagation::MissingIdentityPropagation;
pub use missing_identity_provider_isolation::MissingIdentityProviderIsolation;
pub use missing_identity_store::MissingIdentityStore;
pub use missing_network_segmentation::MissingNetworkSegmentation;
pub use missing_vault::MissingVault;
pub use missing_vault_isolation::MissingVaultIsolation;
pub use missing_waf::MissingWaf;
pub use mixed_targets_on_shared_runtime::MixedTargetsOnSharedRuntime;
pub use path_traversal::PathTraversal;
pub use push_instead_of_pull_deployment::PushInsteadOfPullDeployment;
pub use search_query_injection::SearchQueryInjection;
pub use server_side_request_forgery::ServerSideRequestForgery;
pub use service_registry_poisoning::ServiceRegistryPoisoning;
pub use sql_nosql_injection::SqlNosqlInjection;
pub use unchecked_deployment::UncheckedDeployment;
pub use unencrypted_asset::UnencryptedAsset;
pub use unencrypted_communication::UnencryptedCommunication;
pub use unguarded_access_from_internet::UnguardedAccessFromInternet;
pub use unguarded_direct_datastore_access::UnguardedDirectDatastoreAccess;
pub use unnecessary_communication_link::UnnecessaryCommunicationLink;
pub use unnecessary_data_asset::UnnecessaryDataAsset;
pub use unnecessary_data_transfer::UnnecessaryDataTransfer;
pub use unnecessary_technical_asset::UnnecessaryTechnicalAsset;
pub use untrusted_deserialization::UntrustedDeserialization;
pub use wrong_communication_link_content::WrongCommunicationLinkContent;
pub use wrong_trust_boundary_content::WrongTrustBoundaryContent;
pub use xml_external_entity::XmlExternalEntity;

/// The built-in catalogue, ordered by category id.
pub fn builtin_rules() -> Vec<Box<dyn RiskRule>> {
    vec![
        Box::new(AccidentalSecretLeak),
        Box::new(CodeBackdooring),
        Box::new(ContainerBaseImageBackdooring),
        Box::new(ContainerPlatformEscape),
        Box::new(CrossSiteRequestForgery),
        Box::new(CrossSiteScripting),
        Box::new(DosRiskyAccessAcrossTrustBoundary),
        Box::new(IncompleteModel),
        Box::new(LdapInjection),
        Box::new(MissingAuthentication),
        Box::new(MissingAuthenticationSecondFactor),
        Box::new(MissingBuildInfrastructure),
        Box::new(MissingCloudHardening),
        Box::new(MissingFileValidation),
        Box::new(MissingHardening),
        Box::new(MissingIdentityPropagation),
        Box::new(MissingIdentityProviderIsolation),
        Box::new(MissingIdentityStore),
        Box::new(MissingNetworkSegmentation),
        Box::new(MissingVault),
        Box::new(MissingVaultIsolation),
        Box::new(MissingWaf),
        Box::new(MixedTargetsOnSharedRuntime),
        Box::new(PathTraversal),
        Box::new(PushInsteadOfPullDeployment),
        Box::new(SearchQueryInjection),
        Box::new(ServerSideRequestForgery),
        Box::new(ServiceRegistryPoisoning),
        Box::new(SqlNosqlInjection),
        Box::new(UncheckedDeployment),
        Box::new(UnencryptedAsset),
        Box::new(UnencryptedCommunication),
        Box::new(UnguardedAccessFromInternet),
        Box::new(UnguardedDirectDatastoreAccess),
        Box::new(UnnecessaryCommunicationLink),
        Box::new(UnnecessaryDataAsset),
        Box::new(UnnecessaryDataTransfer),
        Box::new(UnnecessaryTechnicalAsset),
        Box::new(UntrustedDeserialization),
        Box::new(WrongCommunicationLinkContent),
        Box::new(WrongTrustBoundaryContent),
        Box::new(XmlExternalEntity),
    ]
}

/// Static category text of a built-in rule.
pub(crate) struct RuleInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub impact: &'static str,
    pub asvs: &'static str,
    pub cheat_sheet: &'static str,
    pub action: &'static str,
    pub mitigation: &'static str,
    pub check: &'static str,
    pub function: RiskFunction,
    pub stride: Stride,
    pub detection_logic: &'static str,
    pub risk_assessment: &'static str,
    pub false_positives: &'static str,
    pub model_failure_possible_reason: bool,
    pub cwe: u32,
}

impl RuleInfo {
    pub(crate) fn category(&self) -> RiskCategory {
        RiskCategory {
            id: self.id.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            impact: self.impact.to_string(),
            asvs: self.asvs.to_string(),
            cheat_sheet: self.cheat_sheet.to_string(),
            action: self.action.to_string(),
            mitigation: self.mitigation.to_string(),
            check: self.check.to_string(),
            detection_logic: self.detection_logic.to_string(),
            risk_assessment: self.risk_assessment.to_string(),
            false_positives: self.false_positives.to_string(),
            function: self.function,
            stride: self.stride,
            model_failure_possible_reason: self.model_failure_possible_reason,
            cwe: self.cwe,
        }
    }
}

pub(crate) fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|tag| tag.to_string()).collect()
}

/// Deduplicated and sorted, for data breach asset lists.
pub(crate) fn sorted_unique(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Append unless a risk with the same synthetic id is already present.
pub(crate) fn push_unique(risks: &mut Vec<Risk>, risk: Risk) {
    if !risks.iter().any(|existing| existing.synthetic_id == risk.synthetic_id) {
        risks.push(risk);
    }
}

/// Highest protection needs of an element including the data it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rating {
    pub confidentiality: Confidentiality,
    pub integrity: Criticality,
    pub availability: Criticality,
}

impl Rating {
    pub(crate) fn of_asset(asset: &TechnicalAsset, model: &ParsedModel) -> Self {
        Rating {
            confidentiality: asset.highest_confidentiality(model),
            integrity: asset.highest_integrity(model),
            availability: asset.highest_availability(model),
        }
    }

    /// The asset's own rating, ignoring processed and stored data.
    pub(crate) fn own(asset: &TechnicalAsset) -> Self {
        Rating {
            confidentiality: asset.confidentiality,
            integrity: asset.integrity,
            availability: asset.availability,
        }
    }

    pub(crate) fn of_link(link: &CommunicationLink, model: &ParsedModel) -> Self {
        Rating {
            confidentiality: link.highest_confidentiality(model),
            integrity: link.highest_integrity(model),
            availability: link.highest_availability(model),
        }
    }

    pub(crate) fn of_boundary(boundary: &TrustBoundary, model: &ParsedModel) -> Self {
        Rating {
            confidentiality: boundary.highest_confidentiality(model),
            integrity: boundary.highest_integrity(model),
            availability: boundary.highest_availability(model),
        }
    }

    pub(crate) fn of_runtime(runtime: &SharedRuntime, model: &ParsedModel) -> Self {
        Rating {
            confidentiality: runtime.highest_confidentiality(model),
            integrity: runtime.highest_integrity(model),
            availability: runtime.highest_availability(model),
        }
    }

    /// Confidential, or critical integrity or availability, or above.
    pub(crate) fn is_high(self) -> bool {
        self.confidentiality >= Confidentiality::Confidential
            || self.integrity >= Criticality::Critical
            || self.availability >= Criticality::Critical
    }

    /// Strictly confidential, or mission-critical integrity or availability.
    pub(crate) fn is_top(self) -> bool {
        self.confidentiality == Confidentiality::StrictlyConfidential
            || self.integrity == Criticality::MissionCritical
            || self.availability == Criticality::MissionCritical
    }
}

/// How close the nearest unrelated asset gets to a protected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exposure {
    NetworkSegment,
    ExecutionEnvironment,
}

impl Exposure {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Exposure::NetworkSegment => "in the same network segment",
            Exposure::ExecutionEnvironment => "in the same execution environment",
        }
    }
}

/// Closest exposure of `asset` to other assets matching `unrelated`, if any.
pub(crate) fn exposure(
    model: &ParsedModel,
    asset: &TechnicalAsset,
    unrelated: impl Fn(&TechnicalAsset) -> bool,
) -> Option<Exposure> {
    model
        .technical_assets
        .values()
        .filter(|other| other.id != asset.id && unrelated(other))
        .filter_map(|other| {
            if asset.is_same_execution_environment(model, &other.id) {
                Some(Exposure::ExecutionEnvironment)
            } else if asset.is_same_trust_boundary_network_only(model, &other.id) {
                Some(Exposure::NetworkSegment)
            } else {
                None
            }
        })
        .max_by_key(|exposure| *exposure == Exposure::ExecutionEnvironment)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Small in-memory models for rule tests.

    use chrono::NaiveDate;

    use crate::engine::{AnalysisContext, RiskRule};
    use crate::model::{CommunicationLink, DataAsset, ParsedModel, SharedRuntime, TechnicalAsset, TrustBoundary};
    use crate::protocol::Protocol;
    use crate::risk::Risk;
    use crate::technology::Technology;
    use crate::types::{
        Authentication, Authorization, Confidentiality, Criticality, EncryptionStyle, Machine,
        Quantity, TechnicalAssetSize, TechnicalAssetType, TrustBoundaryType, Usage,
    };

    pub(crate) fn asset(id: &str, technology: Technology) -> TechnicalAsset {
        TechnicalAsset {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            kind: TechnicalAssetType::Process,
            usage: Usage::Business,
            used_as_client_by_human: false,
            out_of_scope: false,
            justification_out_of_scope: String::new(),
            size: TechnicalAssetSize::Component,
            technology,
            machine: Machine::Virtual,
            internet: false,
            multi_tenant: false,
            redundant: false,
            custom_developed_parts: false,
            encryption: EncryptionStyle::None,
            owner: String::new(),
            confidentiality: Confidentiality::Internal,
            integrity: Criticality::Operational,
            availability: Criticality::Operational,
            justification_cia_rating: String::new(),
            tags: Vec::new(),
            data_assets_processed: Vec::new(),
            data_assets_stored: Vec::new(),
            data_formats_accepted: Vec::new(),
            communication_links: Vec::new(),
            diagram_tweak_order: 0,
            raa: 0.0,
        }
    }

    pub(crate) fn data(id: &str, confidentiality: Confidentiality, integrity: Criticality) -> DataAsset {
        DataAsset {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            usage: Usage::Business,
            tags: Vec::new(),
            origin: String::new(),
            owner: String::new(),
            quantity: Quantity::Many,
            confidentiality,
            integrity,
            availability: Criticality::Operational,
            justification_cia_rating: String::new(),
        }
    }

    pub(crate) fn link(source: &str, title: &str, target: &str, protocol: Protocol) -> CommunicationLink {
        CommunicationLink {
            id: format!("{source}>{}", crate::model::make_id(title)),
            source_id: source.to_string(),
            target_id: target.to_string(),
            title: title.to_string(),
            description: String::new(),
            protocol,
            tags: Vec::new(),
            vpn: false,
            ip_filtered: false,
            readonly: false,
            authentication: Authentication::None,
            authorization: Authorization::None,
            usage: Usage::Business,
            data_assets_sent: Vec::new(),
            data_assets_received: Vec::new(),
            diagram_tweak_weight: 1,
            diagram_tweak_constraint: true,
        }
    }

    pub(crate) fn boundary(id: &str, kind: TrustBoundaryType, inside: &[&str]) -> TrustBoundary {
        TrustBoundary {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            kind,
            tags: Vec::new(),
            technical_assets_inside: inside.iter().map(|id| id.to_string()).collect(),
            trust_boundaries_nested: Vec::new(),
        }
    }

    pub(crate) fn runtime(id: &str, running: &[&str]) -> SharedRuntime {
        SharedRuntime {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            tags: Vec::new(),
            technical_assets_running: running.iter().map(|id| id.to_string()).collect(),
        }
    }

    /// Builds a model; links are attached to their source asset on `build`.
    #[derive(Default)]
    pub(crate) struct Fixture {
        assets: Vec<TechnicalAsset>,
        links: Vec<CommunicationLink>,
        data: Vec<DataAsset>,
        boundaries: Vec<TrustBoundary>,
        runtimes: Vec<SharedRuntime>,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn asset(mut self, asset: TechnicalAsset) -> Self {
            self.assets.push(asset);
            self
        }

        pub(crate) fn link(mut self, link: CommunicationLink) -> Self {
            self.links.push(link);
            self
        }

        pub(crate) fn data(mut self, data: DataAsset) -> Self {
            self.data.push(data);
            self
        }

        pub(crate) fn boundary(mut self, boundary: TrustBoundary) -> Self {
            self.boundaries.push(boundary);
            self
        }

        pub(crate) fn runtime(mut self, runtime: SharedRuntime) -> Self {
            self.runtimes.push(runtime);
            self
        }

        pub(crate) fn build(self) -> ParsedModel {
            let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let mut model = ParsedModel::new("fixture", date, Criticality::Important);
            for data in self.data {
                model.data_assets.insert(data.id.clone(), data);
            }
            for mut asset in self.assets {
                asset.communication_links = self
                    .links
                    .iter()
                    .filter(|link| link.source_id == asset.id)
                    .cloned()
                    .collect();
                asset.communication_links.sort_by(|a, b| a.id.cmp(&b.id));
                model.technical_assets.insert(asset.id.clone(), asset);
            }
            for boundary in self.boundaries {
                model.trust_boundaries.insert(boundary.id.clone(), boundary);
            }
            for runtime in self.runtimes {
                model.shared_runtimes.insert(runtime.id.clone(), runtime);
            }
            model.reindex();
            model
        }
    }

    pub(crate) fn run(rule: &dyn RiskRule, model: ParsedModel) -> Vec<Risk> {
        let ctx = AnalysisContext::new(model);
        rule.generate_risks(&ctx).unwrap()
    }

    pub(crate) fn ids(risks: &[Risk]) -> Vec<&str> {
        risks.iter().map(|risk| risk.synthetic_id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleRegistry;

    #[test]
    fn catalogue_is_sorted_and_unique() {
        let ids: Vec<String> = builtin_rules().iter().map(|rule| rule.category().id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 42);
        assert_eq!(RuleRegistry::builtin().len(), 42);
    }

    #[test]
    fn every_category_is_documented() {
        for rule in builtin_rules() {
            let category = rule.category();
            assert!(!category.title.is_empty(), "{}", category.id);
            assert!(!category.description.is_empty(), "{}", category.id);
            assert!(!category.mitigation.is_empty(), "{}", category.id);
            assert!(!category.description.contains('<'), "{}", category.id);
        }
    }

    #[test]
    fn rule_tags_are_lower_case() {
        for rule in builtin_rules() {
            for tag in rule.supported_tags() {
                assert_eq!(tag, tag.to_lowercase());
            }
        }
    }
}
