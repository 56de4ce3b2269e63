//! Raw model file format, as written by humans.
//!
//! Enum-valued fields stay plain strings here so the loader can report the
//! exact field and element an unknown value came from.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AuthorInput {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub homepage: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct OverviewInput {
    #[serde(default)]
    pub description: String,
    /// Ordered list of `{file: caption}` entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DataAssetInput {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// `business` or `devops`; empty means business.
    #[serde(default)]
    pub usage: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub confidentiality: String,
    #[serde(default)]
    pub integrity: String,
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub justification_cia_rating: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CommunicationLinkInput {
    pub target: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub authentication: String,
    #[serde(default)]
    pub authorization: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub vpn: bool,
    #[serde(default)]
    pub ip_filtered: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub usage: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_assets_sent: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_assets_received: Vec<String>,
    #[serde(default)]
    pub diagram_tweak_weight: u32,
    /// Set to true to release the layout constraint of this link.
    #[serde(default)]
    pub diagram_tweak_constraint: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TechnicalAssetInput {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub used_as_client_by_human: bool,
    #[serde(default)]
    pub out_of_scope: bool,
    #[serde(default)]
    pub justification_out_of_scope: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub technology: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub internet: bool,
    #[serde(default)]
    pub machine: String,
    #[serde(default)]
    pub encryption: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub confidentiality: String,
    #[serde(default)]
    pub integrity: String,
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub justification_cia_rating: String,
    #[serde(default)]
    pub multi_tenant: bool,
    #[serde(default)]
    pub redundant: bool,
    #[serde(default)]
    pub custom_developed_parts: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_assets_processed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_assets_stored: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_formats_accepted: Vec<String>,
    #[serde(default)]
    pub diagram_tweak_order: i32,
    /// Keyed by link title.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub communication_links: BTreeMap<String, CommunicationLinkInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TrustBoundaryInput {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technical_assets_inside: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_boundaries_nested: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SharedRuntimeInput {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technical_assets_running: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct IndividualRiskCategoryInput {
    pub id: String,
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
    pub function: String,
    #[serde(default)]
    pub stride: String,
    #[serde(default)]
    pub detection_logic: String,
    #[serde(default)]
    pub risk_assessment: String,
    #[serde(default)]
    pub false_positives: String,
    #[serde(default)]
    pub model_failure_possible_reason: bool,
    #[serde(default)]
    pub cwe: u32,
    /// Keyed by risk title.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub risks_identified: BTreeMap<String, RiskIdentifiedInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct RiskIdentifiedInput {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub exploitation_likelihood: String,
    #[serde(default)]
    pub exploitation_impact: String,
    #[serde(default)]
    pub data_breach_probability: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_breach_technical_assets: Vec<String>,
    #[serde(default)]
    pub most_relevant_data_asset: String,
    #[serde(default)]
    pub most_relevant_technical_asset: String,
    #[serde(default)]
    pub most_relevant_communication_link: String,
    #[serde(default)]
    pub most_relevant_trust_boundary: String,
    #[serde(default)]
    pub most_relevant_shared_runtime: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct RiskTrackingInput {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub ticket: String,
    /// YYYY-MM-DD
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub checked_by: String,
}

/// Top-level model file. Element collections are keyed by title.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ModelInput {
    /// Further model files (paths or glob patterns) merged into this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: AuthorInput,
    /// YYYY-MM-DD, empty means today.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub business_overview: OverviewInput,
    #[serde(default)]
    pub technical_overview: OverviewInput,
    #[serde(default)]
    pub business_criticality: String,
    #[serde(default)]
    pub management_summary_comment: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub questions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub abuse_cases: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub security_requirements: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags_available: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data_assets: BTreeMap<String, DataAssetInput>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub technical_assets: BTreeMap<String, TechnicalAssetInput>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub trust_boundaries: BTreeMap<String, TrustBoundaryInput>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub shared_runtimes: BTreeMap<String, SharedRuntimeInput>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub individual_risk_categories: BTreeMap<String, IndividualRiskCategoryInput>,
    /// Keyed by synthetic risk id or a `*` pattern.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub risk_tracking: BTreeMap<String, RiskTrackingInput>,
}
