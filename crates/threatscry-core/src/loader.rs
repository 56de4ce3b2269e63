use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, info};

use crate::error::ModelError;
use crate::input::{
    CommunicationLinkInput, IndividualRiskCategoryInput, ModelInput, RiskIdentifiedInput,
    TechnicalAssetInput,
};
use crate::model::{
    make_id, Author, CommunicationLink, DataAsset, IndividualRiskCategory, Overview, ParsedModel,
    SharedRuntime, TechnicalAsset, TrustBoundary,
};
use crate::risk::{Risk, RiskCategory};
use crate::tracking::RiskTracking;
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskSeverity,
    Usage,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

// --- Reading ---

/// Read a model file, merge its includes and validate it.
pub fn load_model_file(path: &Path) -> Result<ParsedModel, ModelError> {
    let input = read_model_input(path)?;
    build_model(input)
}

/// Parse model text. Includes are resolved against the working directory.
pub fn parse_model(text: &str) -> Result<ParsedModel, ModelError> {
    let mut input: ModelInput = serde_yaml::from_str(text)?;
    let mut visited = BTreeSet::new();
    merge_includes(&mut input, Path::new("."), &mut visited)?;
    build_model(input)
}

/// Read a model file and merge all included files into it, without validating.
pub fn read_model_input(path: &Path) -> Result<ModelInput, ModelError> {
    info!(path = %path.display(), "reading model");
    let mut input = read_single_input(path)?;
    let mut visited = BTreeSet::new();
    visited.insert(canonical(path)?);
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    merge_includes(&mut input, base_dir, &mut visited)?;
    Ok(input)
}

fn read_single_input(path: &Path) -> Result<ModelInput, ModelError> {
    let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn canonical(path: &Path) -> Result<PathBuf, ModelError> {
    path.canonicalize().map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// --- Includes ---

fn merge_includes(
    input: &mut ModelInput,
    base_dir: &Path,
    visited: &mut BTreeSet<PathBuf>,
) -> Result<(), ModelError> {
    for pattern in std::mem::take(&mut input.includes) {
        let full_pattern = base_dir.join(&pattern);
        let entries = glob::glob(&full_pattern.to_string_lossy()).map_err(|source| {
            ModelError::IncludePattern {
                pattern: pattern.clone(),
                source,
            }
        })?;
        let mut paths: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
        paths.sort();
        if paths.is_empty() {
            return Err(ModelError::IncludeNotFound { pattern });
        }

        for path in paths {
            if !visited.insert(canonical(&path)?) {
                return Err(ModelError::IncludeCycle { path });
            }
            debug!(path = %path.display(), "merging included model");
            let mut included = read_single_input(&path)?;
            let nested_dir = path.parent().unwrap_or(base_dir).to_path_buf();
            merge_includes(&mut included, &nested_dir, visited)?;
            merge_input(input, included, &path)?;
        }
    }
    Ok(())
}

/// Merge a partial model into `target`. Scalars already set on the target win.
fn merge_input(target: &mut ModelInput, source: ModelInput, path: &Path) -> Result<(), ModelError> {
    fill_empty(&mut target.title, source.title);
    fill_empty(&mut target.date, source.date);
    fill_empty(&mut target.business_criticality, source.business_criticality);
    fill_empty(&mut target.management_summary_comment, source.management_summary_comment);
    fill_empty(&mut target.author.name, source.author.name);
    fill_empty(&mut target.author.homepage, source.author.homepage);
    fill_empty(&mut target.business_overview.description, source.business_overview.description);
    target.business_overview.images.extend(source.business_overview.images);
    fill_empty(&mut target.technical_overview.description, source.technical_overview.description);
    target.technical_overview.images.extend(source.technical_overview.images);

    for tag in source.tags_available {
        if !target.tags_available.contains(&tag) {
            target.tags_available.push(tag);
        }
    }

    merge_titled(&mut target.questions, source.questions, path)?;
    merge_titled(&mut target.abuse_cases, source.abuse_cases, path)?;
    merge_titled(&mut target.security_requirements, source.security_requirements, path)?;
    merge_titled(&mut target.data_assets, source.data_assets, path)?;
    merge_titled(&mut target.technical_assets, source.technical_assets, path)?;
    merge_titled(&mut target.trust_boundaries, source.trust_boundaries, path)?;
    merge_titled(&mut target.shared_runtimes, source.shared_runtimes, path)?;
    merge_titled(&mut target.individual_risk_categories, source.individual_risk_categories, path)?;
    merge_titled(&mut target.risk_tracking, source.risk_tracking, path)
}

fn fill_empty(target: &mut String, value: String) {
    if target.trim().is_empty() {
        *target = value;
    }
}

fn merge_titled<T>(
    target: &mut BTreeMap<String, T>,
    source: BTreeMap<String, T>,
    path: &Path,
) -> Result<(), ModelError> {
    for (title, value) in source {
        if target.contains_key(&title) {
            return Err(ModelError::DuplicateIncludedTitle {
                path: path.to_path_buf(),
                title,
            });
        }
        target.insert(title, value);
    }
    Ok(())
}

// --- Validation ---

/// Validate raw input and build the cross-referenced graph.
pub fn build_model(input: ModelInput) -> Result<ParsedModel, ModelError> {
    let business_criticality = parse_value(
        &input.business_criticality,
        "business_criticality",
        "application",
    )?;
    let date = if input.date.trim().is_empty() {
        chrono::Local::now().date_naive()
    } else {
        NaiveDate::parse_from_str(input.date.trim(), DATE_FORMAT)
            .map_err(|_| ModelError::InvalidDate(input.date.clone()))?
    };

    let mut model = ParsedModel::new(input.title.clone(), date, business_criticality);
    model.author = Author {
        name: input.author.name.clone(),
        homepage: input.author.homepage.clone(),
    };
    model.management_summary_comment = input.management_summary_comment.clone();
    model.business_overview = Overview {
        description: input.business_overview.description.clone(),
        images: input.business_overview.images.clone(),
    };
    model.technical_overview = Overview {
        description: input.technical_overview.description.clone(),
        images: input.technical_overview.images.clone(),
    };
    model.security_requirements = input.security_requirements.clone();
    model.questions = input.questions.clone();
    model.abuse_cases = input.abuse_cases.clone();
    model.tags_available = lower_case_and_trim(&input.tags_available);

    let tags = TagCatalogue::new(&model.tags_available);

    for (title, asset) in &input.data_assets {
        let element = format!("data asset '{title}'");
        check_id(&asset.id)?;
        if model.data_assets.contains_key(&asset.id) {
            return Err(ModelError::DuplicateId(asset.id.clone()));
        }
        let data = DataAsset {
            id: asset.id.clone(),
            title: title.clone(),
            description: with_default(&asset.description, title),
            usage: parse_or(&asset.usage, Usage::Business, "usage", &element)?,
            tags: tags.check(&asset.tags, &element)?,
            origin: asset.origin.clone(),
            owner: asset.owner.clone(),
            quantity: parse_value(&asset.quantity, "quantity", &element)?,
            confidentiality: parse_value(&asset.confidentiality, "confidentiality", &element)?,
            integrity: parse_value(&asset.integrity, "integrity", &element)?,
            availability: parse_value(&asset.availability, "availability", &element)?,
            justification_cia_rating: asset.justification_cia_rating.clone(),
        };
        model.data_assets.insert(data.id.clone(), data);
    }

    for (title, asset) in &input.technical_assets {
        let parsed = build_technical_asset(&model, &tags, title, asset)?;
        if model.technical_assets.contains_key(&parsed.id) {
            return Err(ModelError::DuplicateId(parsed.id.clone()));
        }
        model.technical_assets.insert(parsed.id.clone(), parsed);
    }

    let mut boundary_of_asset: BTreeMap<String, String> = BTreeMap::new();
    for (title, boundary) in &input.trust_boundaries {
        let element = format!("trust boundary '{title}'");
        check_id(&boundary.id)?;
        if model.trust_boundaries.contains_key(&boundary.id) {
            return Err(ModelError::DuplicateId(boundary.id.clone()));
        }
        for asset_id in &boundary.technical_assets_inside {
            if !model.technical_assets.contains_key(asset_id) {
                return Err(ModelError::missing("technical asset", element.as_str(), asset_id));
            }
            if boundary_of_asset.insert(asset_id.clone(), boundary.id.clone()).is_some() {
                return Err(ModelError::MultipleTrustBoundaries {
                    asset: asset_id.clone(),
                    boundary: title.clone(),
                });
            }
        }
        let parsed = TrustBoundary {
            id: boundary.id.clone(),
            title: title.clone(),
            description: with_default(&boundary.description, title),
            kind: parse_value(&boundary.kind, "type", &element)?,
            tags: tags.check(&boundary.tags, &element)?,
            technical_assets_inside: boundary.technical_assets_inside.clone(),
            trust_boundaries_nested: boundary.trust_boundaries_nested.clone(),
        };
        model.trust_boundaries.insert(parsed.id.clone(), parsed);
    }
    for boundary in model.trust_boundaries.values() {
        for nested in &boundary.trust_boundaries_nested {
            if !model.trust_boundaries.contains_key(nested) {
                return Err(ModelError::missing(
                    "nested trust boundary",
                    format!("trust boundary '{}'", boundary.title),
                    nested,
                ));
            }
        }
    }

    for (title, runtime) in &input.shared_runtimes {
        let element = format!("shared runtime '{title}'");
        check_id(&runtime.id)?;
        if model.shared_runtimes.contains_key(&runtime.id) {
            return Err(ModelError::DuplicateId(runtime.id.clone()));
        }
        for asset_id in &runtime.technical_assets_running {
            if !model.technical_assets.contains_key(asset_id) {
                return Err(ModelError::missing("technical asset target", element.as_str(), asset_id));
            }
        }
        let parsed = SharedRuntime {
            id: runtime.id.clone(),
            title: title.clone(),
            description: with_default(&runtime.description, title),
            tags: tags.check(&runtime.tags, &element)?,
            technical_assets_running: runtime.technical_assets_running.clone(),
        };
        model.shared_runtimes.insert(parsed.id.clone(), parsed);
    }

    // Individual risks may point at links, so the link index must exist first.
    model.reindex();

    for (title, category) in &input.individual_risk_categories {
        let parsed = build_individual_category(&model, title, category)?;
        if model.individual_risk_categories.contains_key(&parsed.category.id) {
            return Err(ModelError::DuplicateId(parsed.category.id.clone()));
        }
        model
            .individual_risk_categories
            .insert(parsed.category.id.clone(), parsed);
    }

    for (key, record) in &input.risk_tracking {
        let id = key.trim().to_lowercase();
        let element = format!("risk tracking '{key}'");
        let date = if record.date.trim().is_empty() {
            None
        } else {
            let parsed = NaiveDate::parse_from_str(record.date.trim(), DATE_FORMAT).map_err(|_| {
                ModelError::InvalidTrackingDate {
                    id: key.clone(),
                    value: record.date.clone(),
                }
            })?;
            Some(parsed)
        };
        let tracking = RiskTracking {
            synthetic_risk_id: id.clone(),
            justification: record.justification.clone(),
            ticket: record.ticket.clone(),
            checked_by: record.checked_by.clone(),
            status: parse_value(&record.status, "status", &element)?,
            date,
        };
        if model.risk_tracking.insert(id.clone(), tracking).is_some() {
            return Err(ModelError::DuplicateId(id));
        }
    }

    for asset in model.technical_assets.values() {
        for link in &asset.communication_links {
            if !model.technical_assets.contains_key(&link.target_id) {
                return Err(ModelError::missing(
                    "technical asset target",
                    format!(
                        "communication link '{}' of technical asset '{}'",
                        link.title, asset.title
                    ),
                    &link.target_id,
                ));
            }
        }
    }

    info!(
        data_assets = model.data_assets.len(),
        technical_assets = model.technical_assets.len(),
        trust_boundaries = model.trust_boundaries.len(),
        "model parsed"
    );
    Ok(model)
}

fn build_technical_asset(
    model: &ParsedModel,
    tags: &TagCatalogue,
    title: &str,
    asset: &TechnicalAssetInput,
) -> Result<TechnicalAsset, ModelError> {
    let element = format!("technical asset '{title}'");
    check_id(&asset.id)?;

    for data_id in asset.data_assets_processed.iter().chain(&asset.data_assets_stored) {
        if !model.data_assets.contains_key(data_id) {
            return Err(ModelError::missing("data asset target", element.as_str(), data_id));
        }
    }

    let data_formats_accepted = asset
        .data_formats_accepted
        .iter()
        .map(|format| parse_value(format, "data_formats_accepted", &element))
        .collect::<Result<Vec<_>, _>>()?;

    let mut communication_links = Vec::with_capacity(asset.communication_links.len());
    for (link_title, link) in &asset.communication_links {
        let parsed = build_link(model, tags, &asset.id, title, link_title, link)?;
        if communication_links
            .iter()
            .any(|existing: &CommunicationLink| existing.id == parsed.id)
        {
            return Err(ModelError::DuplicateId(parsed.id));
        }
        communication_links.push(parsed);
    }
    communication_links.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(TechnicalAsset {
        id: asset.id.clone(),
        title: title.to_string(),
        description: with_default(&asset.description, title),
        kind: parse_value(&asset.kind, "type", &element)?,
        usage: parse_value(&asset.usage, "usage", &element)?,
        used_as_client_by_human: asset.used_as_client_by_human,
        out_of_scope: asset.out_of_scope,
        justification_out_of_scope: asset.justification_out_of_scope.clone(),
        size: parse_value(&asset.size, "size", &element)?,
        technology: parse_value(&asset.technology, "technology", &element)?,
        machine: parse_value(&asset.machine, "machine", &element)?,
        internet: asset.internet,
        multi_tenant: asset.multi_tenant,
        redundant: asset.redundant,
        custom_developed_parts: asset.custom_developed_parts,
        encryption: parse_value(&asset.encryption, "encryption", &element)?,
        owner: asset.owner.clone(),
        confidentiality: parse_value(&asset.confidentiality, "confidentiality", &element)?,
        integrity: parse_value(&asset.integrity, "integrity", &element)?,
        availability: parse_value(&asset.availability, "availability", &element)?,
        justification_cia_rating: asset.justification_cia_rating.clone(),
        tags: tags.check(&asset.tags, &element)?,
        data_assets_processed: asset.data_assets_processed.clone(),
        data_assets_stored: asset.data_assets_stored.clone(),
        data_formats_accepted,
        communication_links,
        diagram_tweak_order: asset.diagram_tweak_order,
        raa: 0.0,
    })
}

fn build_link(
    model: &ParsedModel,
    tags: &TagCatalogue,
    source_id: &str,
    asset_title: &str,
    title: &str,
    link: &CommunicationLinkInput,
) -> Result<CommunicationLink, ModelError> {
    let element = format!("technical asset '{asset_title}' communication link '{title}'");
    let location = format!("communication link '{title}' of technical asset '{asset_title}'");

    for data_id in link.data_assets_sent.iter().chain(&link.data_assets_received) {
        if !model.data_assets.contains_key(data_id) {
            return Err(ModelError::missing("data asset target", location.as_str(), data_id));
        }
    }

    Ok(CommunicationLink {
        id: format!("{source_id}>{}", make_id(title)),
        source_id: source_id.to_string(),
        target_id: link.target.clone(),
        title: title.to_string(),
        description: with_default(&link.description, title),
        protocol: parse_value(&link.protocol, "protocol", &element)?,
        tags: tags.check(&link.tags, &location)?,
        vpn: link.vpn,
        ip_filtered: link.ip_filtered,
        readonly: link.readonly,
        authentication: parse_value(&link.authentication, "authentication", &element)?,
        authorization: parse_value(&link.authorization, "authorization", &element)?,
        usage: parse_value(&link.usage, "usage", &element)?,
        data_assets_sent: link.data_assets_sent.clone(),
        data_assets_received: link.data_assets_received.clone(),
        diagram_tweak_weight: if link.diagram_tweak_weight > 0 {
            link.diagram_tweak_weight
        } else {
            1
        },
        diagram_tweak_constraint: !link.diagram_tweak_constraint,
    })
}

fn build_individual_category(
    model: &ParsedModel,
    title: &str,
    input: &IndividualRiskCategoryInput,
) -> Result<IndividualRiskCategory, ModelError> {
    let element = format!("individual risk category '{title}'");
    check_id(&input.id)?;

    let category = RiskCategory {
        id: input.id.clone(),
        title: title.to_string(),
        description: with_default(&input.description, title),
        impact: input.impact.clone(),
        asvs: input.asvs.clone(),
        cheat_sheet: input.cheat_sheet.clone(),
        action: input.action.clone(),
        mitigation: input.mitigation.clone(),
        check: input.check.clone(),
        detection_logic: input.detection_logic.clone(),
        risk_assessment: input.risk_assessment.clone(),
        false_positives: input.false_positives.clone(),
        function: parse_value(&input.function, "function", &element)?,
        stride: parse_value(&input.stride, "stride", &element)?,
        model_failure_possible_reason: input.model_failure_possible_reason,
        cwe: input.cwe,
    };

    let risks_identified = input
        .risks_identified
        .iter()
        .map(|(risk_title, risk)| build_individual_risk(model, &category.id, risk_title, risk))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IndividualRiskCategory {
        category,
        risks_identified,
    })
}

fn build_individual_risk(
    model: &ParsedModel,
    category_id: &str,
    title: &str,
    input: &RiskIdentifiedInput,
) -> Result<Risk, ModelError> {
    let element = format!("individual risk instance '{title}'");
    let location = format!("individual risk '{title}'");

    let severity = parse_or(&input.severity, RiskSeverity::Medium, "severity", &element)?;
    let likelihood = parse_or(
        &input.exploitation_likelihood,
        RiskExploitationLikelihood::Likely,
        "exploitation_likelihood",
        &element,
    )?;
    let impact = parse_or(
        &input.exploitation_impact,
        RiskExploitationImpact::Medium,
        "exploitation_impact",
        &element,
    )?;
    let probability = parse_or(
        &input.data_breach_probability,
        DataBreachProbability::Possible,
        "data_breach_probability",
        &element,
    )?;

    let mut risk = Risk::new(category_id, likelihood, impact, title);
    // Severity of individual risks is stated by the modeller, not derived.
    risk.severity = severity;

    let data_asset = input.most_relevant_data_asset.trim();
    if !data_asset.is_empty() {
        if model.data_asset(data_asset).is_none() {
            return Err(ModelError::missing("data asset target", location.as_str(), data_asset));
        }
        risk = risk.data_asset(data_asset);
    }
    let technical_asset = input.most_relevant_technical_asset.trim();
    if !technical_asset.is_empty() {
        if model.technical_asset(technical_asset).is_none() {
            return Err(ModelError::missing(
                "technical asset target",
                location.as_str(),
                technical_asset,
            ));
        }
        risk = risk.technical_asset(technical_asset);
    }
    let link = input.most_relevant_communication_link.trim();
    if !link.is_empty() {
        if model.communication_link(link).is_none() {
            return Err(ModelError::missing("communication link", location.as_str(), link));
        }
        risk = risk.communication_link(link);
    }
    let boundary = input.most_relevant_trust_boundary.trim();
    if !boundary.is_empty() {
        if model.trust_boundary(boundary).is_none() {
            return Err(ModelError::missing("trust boundary", location.as_str(), boundary));
        }
        risk = risk.trust_boundary(boundary);
    }
    let runtime = input.most_relevant_shared_runtime.trim();
    if !runtime.is_empty() {
        if !model.shared_runtimes.contains_key(runtime) {
            return Err(ModelError::missing("shared runtime", location.as_str(), runtime));
        }
        risk = risk.shared_runtime(runtime);
    }

    let breach_location = format!("data breach technical assets of individual risk '{title}'");
    for asset_id in &input.data_breach_technical_assets {
        if model.technical_asset(asset_id).is_none() {
            return Err(ModelError::missing(
                "technical asset target",
                breach_location.as_str(),
                asset_id,
            ));
        }
    }

    Ok(risk
        .breach(probability, input.data_breach_technical_assets.clone())
        .with_composed_id())
}

// --- Helpers ---

fn parse_value<T: FromStr>(value: &str, field: &'static str, element: &str) -> Result<T, ModelError> {
    value
        .parse()
        .map_err(|_| ModelError::unknown(field, element, value))
}

fn parse_or<T: FromStr>(
    value: &str,
    default: T,
    field: &'static str,
    element: &str,
) -> Result<T, ModelError> {
    if value.trim().is_empty() {
        Ok(default)
    } else {
        parse_value(value, field, element)
    }
}

static ID_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-]+$").expect("valid id pattern"));

fn check_id(id: &str) -> Result<(), ModelError> {
    if ID_SYNTAX.is_match(id) {
        Ok(())
    } else {
        Err(ModelError::InvalidId(id.to_string()))
    }
}

fn with_default(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

fn lower_case_and_trim(tags: &[String]) -> Vec<String> {
    tags.iter().map(|tag| tag.trim().to_lowercase()).collect()
}

/// The model-wide `tags_available` list every element tag must come from.
struct TagCatalogue(BTreeSet<String>);

impl TagCatalogue {
    fn new(available: &[String]) -> Self {
        TagCatalogue(available.iter().cloned().collect())
    }

    fn check(&self, tags: &[String], location: &str) -> Result<Vec<String>, ModelError> {
        let tags = lower_case_and_trim(tags);
        match tags.iter().find(|tag| !self.0.contains(*tag)) {
            Some(tag) => Err(ModelError::missing("tag in overall tag list", location, tag)),
            None => Ok(tags),
        }
    }
}
