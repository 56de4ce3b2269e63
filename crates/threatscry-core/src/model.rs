use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::protocol::Protocol;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::tracking::RiskTracking;
use crate::types::{
    Authentication, Authorization, Confidentiality, Criticality, DataFormat, EncryptionStyle,
    Machine, Quantity, TechnicalAssetSize, TechnicalAssetType, TrustBoundaryType, Usage,
};

// --- Graph elements ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub homepage: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Overview {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataAsset {
    pub id: String,
    pub title: String,
    pub description: String,
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub owner: String,
    pub quantity: Quantity,
    pub confidentiality: Confidentiality,
    pub integrity: Criticality,
    pub availability: Criticality,
    #[serde(default)]
    pub justification_cia_rating: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunicationLink {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub title: String,
    pub description: String,
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub vpn: bool,
    pub ip_filtered: bool,
    pub readonly: bool,
    pub authentication: Authentication,
    pub authorization: Authorization,
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_assets_sent: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_assets_received: Vec<String>,
    #[serde(default = "default_weight")]
    pub diagram_tweak_weight: u32,
    #[serde(default = "default_constraint")]
    pub diagram_tweak_constraint: bool,
}

fn default_weight() -> u32 {
    1
}

fn default_constraint() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalAsset {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TechnicalAssetType,
    pub usage: Usage,
    pub used_as_client_by_human: bool,
    pub out_of_scope: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub justification_out_of_scope: String,
    pub size: TechnicalAssetSize,
    pub technology: Technology,
    pub machine: Machine,
    pub internet: bool,
    pub multi_tenant: bool,
    pub redundant: bool,
    pub custom_developed_parts: bool,
    pub encryption: EncryptionStyle,
    #[serde(default)]
    pub owner: String,
    pub confidentiality: Confidentiality,
    pub integrity: Criticality,
    pub availability: Criticality,
    #[serde(default)]
    pub justification_cia_rating: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_assets_processed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_assets_stored: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_formats_accepted: Vec<DataFormat>,
    /// Sorted by link id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub communication_links: Vec<CommunicationLink>,
    #[serde(default)]
    pub diagram_tweak_order: i32,
    /// Relative attacker attractiveness, set by the RAA plugin.
    #[serde(default)]
    pub raa: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrustBoundary {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TrustBoundaryType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technical_assets_inside: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_boundaries_nested: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SharedRuntime {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technical_assets_running: Vec<String>,
}

/// A risk category declared inside the model together with its pre-identified risks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndividualRiskCategory {
    #[serde(flatten)]
    pub category: RiskCategory,
    #[serde(default)]
    pub risks_identified: Vec<Risk>,
}

// --- Parsed model ---

/// The validated, cross-referenced graph. Collections are keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedModel {
    pub title: String,
    #[serde(default)]
    pub author: Author,
    pub date: NaiveDate,
    pub business_criticality: Criticality,
    #[serde(default)]
    pub management_summary_comment: String,
    #[serde(default)]
    pub business_overview: Overview,
    #[serde(default)]
    pub technical_overview: Overview,
    #[serde(default)]
    pub security_requirements: BTreeMap<String, String>,
    #[serde(default)]
    pub questions: BTreeMap<String, String>,
    #[serde(default)]
    pub abuse_cases: BTreeMap<String, String>,
    #[serde(default)]
    pub tags_available: Vec<String>,
    #[serde(default)]
    pub data_assets: BTreeMap<String, DataAsset>,
    #[serde(default)]
    pub technical_assets: BTreeMap<String, TechnicalAsset>,
    #[serde(default)]
    pub trust_boundaries: BTreeMap<String, TrustBoundary>,
    #[serde(default)]
    pub shared_runtimes: BTreeMap<String, SharedRuntime>,
    #[serde(default)]
    pub individual_risk_categories: BTreeMap<String, IndividualRiskCategory>,
    /// Keyed by lower-cased synthetic id or wildcard pattern.
    #[serde(default)]
    pub risk_tracking: BTreeMap<String, RiskTracking>,

    #[serde(skip)]
    incoming_links: BTreeMap<String, Vec<CommunicationLink>>,
    #[serde(skip)]
    links_by_id: BTreeMap<String, CommunicationLink>,
    #[serde(skip)]
    direct_boundary: BTreeMap<String, String>,
    #[serde(skip)]
    parent_boundary: BTreeMap<String, String>,
}

impl ParsedModel {
    pub fn new(title: impl Into<String>, date: NaiveDate, business_criticality: Criticality) -> Self {
        ParsedModel {
            title: title.into(),
            author: Author::default(),
            date,
            business_criticality,
            management_summary_comment: String::new(),
            business_overview: Overview::default(),
            technical_overview: Overview::default(),
            security_requirements: BTreeMap::new(),
            questions: BTreeMap::new(),
            abuse_cases: BTreeMap::new(),
            tags_available: Vec::new(),
            data_assets: BTreeMap::new(),
            technical_assets: BTreeMap::new(),
            trust_boundaries: BTreeMap::new(),
            shared_runtimes: BTreeMap::new(),
            individual_risk_categories: BTreeMap::new(),
            risk_tracking: BTreeMap::new(),
            incoming_links: BTreeMap::new(),
            links_by_id: BTreeMap::new(),
            direct_boundary: BTreeMap::new(),
            parent_boundary: BTreeMap::new(),
        }
    }

    /// Deserialize a model handed over by the engine (plugins) and rebuild its indexes.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let mut model: ParsedModel = serde_json::from_str(text)?;
        model.reindex();
        Ok(model)
    }

    /// Rebuild the derived lookup tables. Must be called after mutating the graph.
    pub fn reindex(&mut self) {
        self.incoming_links.clear();
        self.links_by_id.clear();
        self.direct_boundary.clear();
        self.parent_boundary.clear();

        for asset in self.technical_assets.values() {
            for link in &asset.communication_links {
                self.incoming_links
                    .entry(link.target_id.clone())
                    .or_default()
                    .push(link.clone());
                self.links_by_id.insert(link.id.clone(), link.clone());
            }
        }
        for boundary in self.trust_boundaries.values() {
            for asset_id in &boundary.technical_assets_inside {
                self.direct_boundary
                    .entry(asset_id.clone())
                    .or_insert_with(|| boundary.id.clone());
            }
            for nested in &boundary.trust_boundaries_nested {
                self.parent_boundary
                    .entry(nested.clone())
                    .or_insert_with(|| boundary.id.clone());
            }
        }
    }

    pub fn technical_asset(&self, id: &str) -> Option<&TechnicalAsset> {
        self.technical_assets.get(id)
    }

    pub fn data_asset(&self, id: &str) -> Option<&DataAsset> {
        self.data_assets.get(id)
    }

    pub fn trust_boundary(&self, id: &str) -> Option<&TrustBoundary> {
        self.trust_boundaries.get(id)
    }

    pub fn communication_link(&self, id: &str) -> Option<&CommunicationLink> {
        self.links_by_id.get(id)
    }

    /// All links of all assets, ordered by source asset id then link id.
    pub fn communication_links(&self) -> impl Iterator<Item = &CommunicationLink> {
        self.technical_assets
            .values()
            .flat_map(|asset| asset.communication_links.iter())
    }

    /// Links pointing at `target_id`, ordered by source asset id then link id.
    pub fn incoming_links(&self, target_id: &str) -> &[CommunicationLink] {
        self.incoming_links
            .get(target_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn in_scope_technical_assets(&self) -> impl Iterator<Item = &TechnicalAsset> {
        self.technical_assets.values().filter(|asset| !asset.out_of_scope)
    }

    pub fn direct_trust_boundary(&self, asset_id: &str) -> Option<&TrustBoundary> {
        self.direct_boundary
            .get(asset_id)
            .and_then(|id| self.trust_boundaries.get(id))
    }

    pub fn parent_trust_boundary(&self, boundary_id: &str) -> Option<&TrustBoundary> {
        self.parent_boundary
            .get(boundary_id)
            .and_then(|id| self.trust_boundaries.get(id))
    }

    /// The direct boundary, or its parent when the direct one is not a network boundary.
    /// `None` stands for "no boundary", which behaves like an unnamed network.
    pub fn network_trust_boundary(&self, asset_id: &str) -> Option<&TrustBoundary> {
        match self.direct_trust_boundary(asset_id) {
            Some(boundary) if !boundary.kind.is_network_boundary() => {
                self.parent_trust_boundary(&boundary.id)
            }
            other => other,
        }
    }

    pub fn shared_runtimes_running(&self, asset_id: &str) -> impl Iterator<Item = &SharedRuntime> {
        let asset_id = asset_id.to_string();
        self.shared_runtimes
            .values()
            .filter(move |runtime| runtime.technical_assets_running.contains(&asset_id))
    }

    /// Ids of this boundary and all of its ancestors, closest first.
    pub fn boundary_ancestry(&self, boundary_id: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut current = Some(boundary_id.to_string());
        while let Some(id) = current {
            if result.contains(&id) {
                break;
            }
            current = self.parent_boundary.get(&id).cloned();
            result.push(id);
        }
        result
    }

    /// True when both assets sit in no boundary, the same boundary, or boundaries with a common ancestor.
    pub fn is_sharing_same_parent_trust_boundary(&self, left: &str, right: &str) -> bool {
        match (self.direct_boundary.get(left), self.direct_boundary.get(right)) {
            (None, None) => true,
            (Some(l), Some(r)) if l == r => true,
            (Some(l), Some(r)) => {
                let right_ancestry = self.boundary_ancestry(r);
                self.boundary_ancestry(l)
                    .iter()
                    .any(|id| right_ancestry.contains(id))
            }
            _ => false,
        }
    }

    fn data_assets_of<'a>(&'a self, ids: &'a [String]) -> impl Iterator<Item = &'a DataAsset> + 'a {
        ids.iter().filter_map(move |id| self.data_assets.get(id))
    }
}

// --- Tag helpers ---

pub fn contains_case_insensitive_any(tags: &[String], candidates: &[&str]) -> bool {
    tags.iter().any(|tag| {
        let tag = tag.trim().to_lowercase();
        candidates
            .iter()
            .any(|candidate| candidate.trim().to_lowercase() == tag)
    })
}

/// Base tags come before the colon: `aws:ec2` has base tag `aws`. A plain `aws` matches too.
pub fn is_tagged_with_base_tag(tags: &[String], base_tag: &str) -> bool {
    let base = base_tag.trim().to_lowercase();
    tags.iter().any(|tag| {
        let tag = tag.trim().to_lowercase();
        tag == base || tag.starts_with(&format!("{base}:"))
    })
}

// --- Sensitivity and graph queries ---

impl DataAsset {
    pub fn is_tagged_with_any(&self, tags: &[&str]) -> bool {
        contains_case_insensitive_any(&self.tags, tags)
    }
}

impl TechnicalAsset {
    pub fn is_tagged_with_any(&self, tags: &[&str]) -> bool {
        contains_case_insensitive_any(&self.tags, tags)
    }

    pub fn is_tagged_with_base_tag(&self, base_tag: &str) -> bool {
        is_tagged_with_base_tag(&self.tags, base_tag)
    }

    /// Own tags first, then the enclosing trust boundaries upwards, then shared runtimes.
    pub fn is_tagged_with_any_traversing_up(&self, model: &ParsedModel, tags: &[&str]) -> bool {
        if self.is_tagged_with_any(tags) {
            return true;
        }
        if let Some(boundary) = model.direct_trust_boundary(&self.id) {
            if boundary.is_tagged_with_any_traversing_up(model, tags) {
                return true;
            }
        }
        model
            .shared_runtimes_running(&self.id)
            .any(|runtime| runtime.is_tagged_with_any(tags))
    }

    pub fn highest_confidentiality(&self, model: &ParsedModel) -> Confidentiality {
        model
            .data_assets_of(&self.data_assets_processed)
            .chain(model.data_assets_of(&self.data_assets_stored))
            .map(|data| data.confidentiality)
            .fold(self.confidentiality, Ord::max)
    }

    pub fn highest_integrity(&self, model: &ParsedModel) -> Criticality {
        model
            .data_assets_of(&self.data_assets_processed)
            .chain(model.data_assets_of(&self.data_assets_stored))
            .map(|data| data.integrity)
            .fold(self.integrity, Ord::max)
    }

    pub fn highest_availability(&self, model: &ParsedModel) -> Criticality {
        model
            .data_assets_of(&self.data_assets_processed)
            .chain(model.data_assets_of(&self.data_assets_stored))
            .map(|data| data.availability)
            .fold(self.availability, Ord::max)
    }

    /// Attractiveness of the asset's own ratings, used to pick the "most relevant" asset.
    pub fn sensitivity_score(&self) -> f64 {
        self.confidentiality.attractiveness_for_asset()
            + self.integrity.attractiveness_for_asset()
            + self.availability.attractiveness_for_asset()
    }

    pub fn processes_or_stores_data_asset(&self, data_asset_id: &str) -> bool {
        self.data_assets_processed.iter().any(|id| id == data_asset_id)
            || self.data_assets_stored.iter().any(|id| id == data_asset_id)
    }

    pub fn accepts(&self, format: DataFormat) -> bool {
        self.data_formats_accepted.contains(&format)
    }

    pub fn is_same_trust_boundary(&self, model: &ParsedModel, other_id: &str) -> bool {
        model.direct_boundary.get(&self.id) == model.direct_boundary.get(other_id)
    }

    pub fn is_same_execution_environment(&self, model: &ParsedModel, other_id: &str) -> bool {
        match (
            model.direct_trust_boundary(&self.id),
            model.direct_trust_boundary(other_id),
        ) {
            (Some(mine), Some(other)) => {
                mine.kind == TrustBoundaryType::ExecutionEnvironment
                    && other.kind == TrustBoundaryType::ExecutionEnvironment
                    && mine.id == other.id
            }
            _ => false,
        }
    }

    pub fn is_same_trust_boundary_network_only(&self, model: &ParsedModel, other_id: &str) -> bool {
        let mine = model.network_trust_boundary(&self.id).map(|b| &b.id);
        let other = model.network_trust_boundary(other_id).map(|b| &b.id);
        mine == other
    }

    /// A communication link exists in either direction.
    pub fn has_direct_connection(&self, model: &ParsedModel, other_id: &str) -> bool {
        model
            .incoming_links(&self.id)
            .iter()
            .any(|link| link.source_id == other_id)
            || model
                .incoming_links(other_id)
                .iter()
                .any(|link| link.source_id == self.id)
    }
}

impl CommunicationLink {
    pub fn is_tagged_with_any(&self, tags: &[&str]) -> bool {
        contains_case_insensitive_any(&self.tags, tags)
    }

    pub fn is_across_trust_boundary(&self, model: &ParsedModel) -> bool {
        model.direct_boundary.get(&self.source_id) != model.direct_boundary.get(&self.target_id)
    }

    /// Crosses a network boundary, ignoring execution environments.
    pub fn is_across_trust_boundary_network_only(&self, model: &ParsedModel) -> bool {
        let source = model.network_trust_boundary(&self.source_id);
        let target = model.network_trust_boundary(&self.target_id);
        let target_is_network = target.map_or(true, |b| b.kind.is_network_boundary());
        source.map(|b| &b.id) != target.map(|b| &b.id) && target_is_network
    }

    pub fn sends_or_receives_data(&self) -> bool {
        !self.data_assets_sent.is_empty() || !self.data_assets_received.is_empty()
    }

    pub fn highest_confidentiality(&self, model: &ParsedModel) -> Confidentiality {
        model
            .data_assets_of(&self.data_assets_sent)
            .chain(model.data_assets_of(&self.data_assets_received))
            .map(|data| data.confidentiality)
            .fold(Confidentiality::Public, Ord::max)
    }

    pub fn highest_integrity(&self, model: &ParsedModel) -> Criticality {
        model
            .data_assets_of(&self.data_assets_sent)
            .chain(model.data_assets_of(&self.data_assets_received))
            .map(|data| data.integrity)
            .fold(Criticality::Archive, Ord::max)
    }

    pub fn highest_availability(&self, model: &ParsedModel) -> Criticality {
        model
            .data_assets_of(&self.data_assets_sent)
            .chain(model.data_assets_of(&self.data_assets_received))
            .map(|data| data.availability)
            .fold(Criticality::Archive, Ord::max)
    }
}

impl TrustBoundary {
    pub fn is_tagged_with_any(&self, tags: &[&str]) -> bool {
        contains_case_insensitive_any(&self.tags, tags)
    }

    pub fn is_tagged_with_base_tag(&self, base_tag: &str) -> bool {
        is_tagged_with_base_tag(&self.tags, base_tag)
    }

    pub fn is_tagged_with_any_traversing_up(&self, model: &ParsedModel, tags: &[&str]) -> bool {
        model
            .boundary_ancestry(&self.id)
            .iter()
            .filter_map(|id| model.trust_boundary(id))
            .any(|boundary| boundary.is_tagged_with_any(tags))
    }

    /// Assets inside this boundary and all nested boundaries, in declaration order.
    pub fn recursive_technical_asset_ids(&self, model: &ParsedModel) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited = BTreeSet::new();
        collect_assets(self, model, &mut visited, &mut result);
        result
    }

    pub fn highest_confidentiality(&self, model: &ParsedModel) -> Confidentiality {
        self.recursive_technical_asset_ids(model)
            .iter()
            .filter_map(|id| model.technical_asset(id))
            .map(|asset| asset.highest_confidentiality(model))
            .fold(Confidentiality::Public, Ord::max)
    }

    pub fn highest_integrity(&self, model: &ParsedModel) -> Criticality {
        self.recursive_technical_asset_ids(model)
            .iter()
            .filter_map(|id| model.technical_asset(id))
            .map(|asset| asset.highest_integrity(model))
            .fold(Criticality::Archive, Ord::max)
    }

    pub fn highest_availability(&self, model: &ParsedModel) -> Criticality {
        self.recursive_technical_asset_ids(model)
            .iter()
            .filter_map(|id| model.technical_asset(id))
            .map(|asset| asset.highest_availability(model))
            .fold(Criticality::Archive, Ord::max)
    }
}

fn collect_assets(
    boundary: &TrustBoundary,
    model: &ParsedModel,
    visited: &mut BTreeSet<String>,
    result: &mut Vec<String>,
) {
    if !visited.insert(boundary.id.clone()) {
        return;
    }
    result.extend(boundary.technical_assets_inside.iter().cloned());
    for nested in &boundary.trust_boundaries_nested {
        if let Some(nested) = model.trust_boundary(nested) {
            collect_assets(nested, model, visited, result);
        }
    }
}

impl SharedRuntime {
    pub fn is_tagged_with_any(&self, tags: &[&str]) -> bool {
        contains_case_insensitive_any(&self.tags, tags)
    }

    pub fn is_tagged_with_base_tag(&self, base_tag: &str) -> bool {
        is_tagged_with_base_tag(&self.tags, base_tag)
    }

    fn running<'a>(&'a self, model: &'a ParsedModel) -> impl Iterator<Item = &'a TechnicalAsset> + 'a {
        self.technical_assets_running
            .iter()
            .filter_map(move |id| model.technical_asset(id))
    }

    pub fn highest_confidentiality(&self, model: &ParsedModel) -> Confidentiality {
        self.running(model)
            .map(|asset| asset.highest_confidentiality(model))
            .fold(Confidentiality::Public, Ord::max)
    }

    pub fn highest_integrity(&self, model: &ParsedModel) -> Criticality {
        self.running(model)
            .map(|asset| asset.highest_integrity(model))
            .fold(Criticality::Archive, Ord::max)
    }

    pub fn highest_availability(&self, model: &ParsedModel) -> Criticality {
        self.running(model)
            .map(|asset| asset.highest_availability(model))
            .fold(Criticality::Archive, Ord::max)
    }
}

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^A-Za-z0-9]+").expect("valid slug pattern"));

/// Slug used for communication link ids: lower-case, non-alphanumerics collapsed to `-`.
pub fn make_id(value: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&value.to_lowercase(), "-")
        .trim_matches(|c| c == '-' || c == ' ')
        .to_string()
}
