use std::collections::BTreeSet;

use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{is_tagged_with_base_tag, ParsedModel, SharedRuntime, TechnicalAsset, TrustBoundary};
use crate::risk::{Risk, RiskCategory};
use crate::types::{
    DataBreachProbability, RiskExploitationImpact, RiskExploitationLikelihood, RiskFunction, Stride,
};

use super::{push_unique, Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "missing-cloud-hardening",
    title: "Missing Cloud Hardening",
    description: "Cloud components should be hardened according to the cloud vendor best practices. This affects their configuration, auditing, and further areas.",
    impact: "If this risk is unmitigated, attackers might access cloud components in an unintended way.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
    action: "Cloud Hardening",
    mitigation: "Apply hardening of all cloud components and services, taking special care to follow the individual risk descriptions (which depend on the cloud provider tags in the model). For Amazon Web Services (AWS): Follow the CIS Benchmark for Amazon Web Services (see also the automated checks of cloud audit tools like \"PacBot\", \"CloudSploit\", \"CloudMapper\", \"ScoutSuite\", or \"Prowler AWS CIS Benchmark Tool\"). For EC2 and other servers running Amazon Linux, follow the CIS Benchmark for Amazon Linux and switch to IMDSv2. For S3 buckets follow the Security Best Practices for Amazon S3 at https://docs.aws.amazon.com/AmazonS3/latest/dev/security-best-practices.html to avoid accidental leakage. Also take a look at some of these tools: https://github.com/toniblyx/my-arsenal-of-aws-security-tools For Microsoft Azure: Follow the CIS Benchmark for Microsoft Azure (see also the automated checks of cloud audit tools like \"CloudSploit\" or \"ScoutSuite\"). For Google Cloud Platform: Follow the CIS Benchmark for Google Cloud Computing Platform (see also the automated checks of cloud audit tools like \"CloudSploit\" or \"ScoutSuite\"). For Oracle Cloud Platform: Follow the hardening best practices (see also the automated checks of cloud audit tools like \"CloudSploit\").",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::Tampering,
    detection_logic: "In-scope cloud components (either residing in cloud trust boundaries or more specifically tagged with cloud provider types).",
    risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
    false_positives: "Cloud components not running parts of the target architecture can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 1008,
};

const PROVIDER_TAGS: [&str; 4] = ["aws", "azure", "gcp", "ocp"];

const AWS_SUBTAGS: [&str; 10] = [
    "aws:vpc",
    "aws:ec2",
    "aws:s3",
    "aws:ebs",
    "aws:apigateway",
    "aws:lambda",
    "aws:dynamodb",
    "aws:rds",
    "aws:sqs",
    "aws:iam",
];

/// Subtags with their own hardening guide, checked per asset.
const AWS_SUBTAG_GUIDES: [(&str, &str, &str); 2] = [
    ("aws:ec2", "EC2", "CIS Benchmark for Amazon Linux"),
    ("aws:s3", "S3", "Security Best Practices for AWS S3"),
];

struct Provider {
    base_tag: &'static str,
    label: &'static str,
    guide: &'static str,
}

const PROVIDERS: [Provider; 4] = [
    Provider {
        base_tag: "aws",
        label: "AWS",
        guide: "CIS Benchmark for AWS",
    },
    Provider {
        base_tag: "azure",
        label: "Azure",
        guide: "CIS Benchmark for Microsoft Azure",
    },
    Provider {
        base_tag: "gcp",
        label: "GCP",
        guide: "CIS Benchmark for Google Cloud Computing Platform",
    },
    Provider {
        base_tag: "ocp",
        label: "OCP",
        guide: "Vendor Best Practices for Oracle Cloud Platform",
    },
];

fn supported_tags() -> Vec<&'static str> {
    PROVIDER_TAGS.iter().chain(AWS_SUBTAGS.iter()).copied().collect()
}

pub struct MissingCloudHardening;

impl RiskRule for MissingCloudHardening {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn supported_tags(&self) -> Vec<String> {
        supported_tags().into_iter().map(str::to_string).collect()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let cloud = CloudElements::collect(model);
        Ok(cloud.into_risks(model))
    }
}

#[derive(Default)]
struct ProviderElements {
    runtimes: BTreeSet<String>,
    boundaries: BTreeSet<String>,
    assets: BTreeSet<String>,
}

/// Cloud elements grouped by provider. Untagged cloud boundaries and runtimes
/// only get the generic hardening risk.
#[derive(Default)]
struct CloudElements {
    providers: [ProviderElements; 4],
    unspecific_runtimes: BTreeSet<String>,
    unspecific_boundaries: BTreeSet<String>,
    subtagged_assets: BTreeSet<String>,
}

impl CloudElements {
    fn collect(model: &ParsedModel) -> Self {
        let supported = supported_tags();
        let mut cloud = CloudElements::default();

        for boundary in model.trust_boundaries.values() {
            let tagged = boundary.is_tagged_with_any(&supported);
            if !tagged && !boundary.kind.is_within_cloud() {
                continue;
            }
            cloud.add_boundary(boundary, tagged);
            for asset in recursive_assets(model, boundary) {
                if asset.is_tagged_with_any(&supported) {
                    cloud.add_asset(asset, &asset.tags);
                } else if tagged {
                    cloud.add_asset(asset, &boundary.tags);
                }
            }
        }

        for asset in model.technical_assets.values() {
            if asset.is_tagged_with_any(&supported) {
                cloud.add_asset(asset, &asset.tags);
            }
        }
        for boundary in model.trust_boundaries.values() {
            if !boundary.is_tagged_with_any(&supported) {
                continue;
            }
            for asset in recursive_assets(model, boundary) {
                let tags = if asset.is_tagged_with_any(&supported) {
                    &asset.tags
                } else {
                    &boundary.tags
                };
                cloud.add_asset(asset, tags);
            }
        }
        for runtime in model.shared_runtimes.values() {
            if !runtime.is_tagged_with_any(&supported) {
                continue;
            }
            cloud.add_runtime(runtime, true);
            for asset in runtime
                .technical_assets_running
                .iter()
                .filter_map(|id| model.technical_asset(id))
            {
                cloud.add_asset(asset, &runtime.tags);
            }
        }

        for provider in &cloud.providers {
            for id in &provider.runtimes {
                cloud.unspecific_runtimes.remove(id);
            }
            for id in &provider.boundaries {
                cloud.unspecific_boundaries.remove(id);
            }
        }
        cloud
    }

    fn add_boundary(&mut self, boundary: &TrustBoundary, tagged: bool) {
        if !tagged {
            self.unspecific_boundaries.insert(boundary.id.clone());
            return;
        }
        for (provider, elements) in PROVIDERS.iter().zip(self.providers.iter_mut()) {
            if boundary.is_tagged_with_base_tag(provider.base_tag) {
                elements.boundaries.insert(boundary.id.clone());
            }
        }
    }

    fn add_runtime(&mut self, runtime: &SharedRuntime, tagged: bool) {
        if !tagged {
            self.unspecific_runtimes.insert(runtime.id.clone());
            return;
        }
        for (provider, elements) in PROVIDERS.iter().zip(self.providers.iter_mut()) {
            if runtime.is_tagged_with_base_tag(provider.base_tag) {
                elements.runtimes.insert(runtime.id.clone());
            }
        }
    }

    /// File the asset under every provider found in `tags`, which may be inherited.
    fn add_asset(&mut self, asset: &TechnicalAsset, tags: &[String]) {
        if asset.is_tagged_with_any(&AWS_SUBTAGS) {
            self.subtagged_assets.insert(asset.id.clone());
        }
        for (provider, elements) in PROVIDERS.iter().zip(self.providers.iter_mut()) {
            if is_tagged_with_base_tag(tags, provider.base_tag) {
                elements.assets.insert(asset.id.clone());
            }
        }
    }

    fn into_risks(self, model: &ParsedModel) -> Vec<Risk> {
        let mut risks = Vec::new();
        let mut covered = [false; 4];

        for ((provider, elements), covered) in PROVIDERS.iter().zip(&self.providers).zip(covered.iter_mut()) {
            for runtime in elements.runtimes.iter().filter_map(|id| model.shared_runtimes.get(id)) {
                push_unique(&mut risks, runtime_risk(model, runtime, Some(provider)));
                *covered = true;
            }
        }
        for runtime in self.unspecific_runtimes.iter().filter_map(|id| model.shared_runtimes.get(id)) {
            push_unique(&mut risks, runtime_risk(model, runtime, None));
        }

        for ((provider, elements), covered) in PROVIDERS.iter().zip(&self.providers).zip(covered.iter_mut()) {
            for boundary in elements.boundaries.iter().filter_map(|id| model.trust_boundary(id)) {
                push_unique(&mut risks, boundary_risk(model, boundary, Some(provider)));
                *covered = true;
            }
        }
        for boundary in self.unspecific_boundaries.iter().filter_map(|id| model.trust_boundary(id)) {
            push_unique(&mut risks, boundary_risk(model, boundary, None));
        }

        // One example asset per provider not yet covered by a runtime or boundary.
        for ((provider, elements), covered) in PROVIDERS.iter().zip(&self.providers).zip(covered) {
            if covered {
                continue;
            }
            if let Some(asset) = most_sensitive(model, &elements.assets) {
                push_unique(&mut risks, asset_risk(model, asset, provider.label, provider.guide));
            }
        }

        for asset in self.subtagged_assets.iter().filter_map(|id| model.technical_asset(id)) {
            for (tag, label, guide) in AWS_SUBTAG_GUIDES {
                if asset.is_tagged_with_any_traversing_up(model, &[tag]) {
                    push_unique(&mut risks, asset_risk(model, asset, label, guide));
                }
            }
        }
        risks
    }
}

fn recursive_assets<'a>(
    model: &'a ParsedModel,
    boundary: &TrustBoundary,
) -> impl Iterator<Item = &'a TechnicalAsset> + 'a {
    boundary
        .recursive_technical_asset_ids(model)
        .into_iter()
        .filter_map(move |id| model.technical_asset(&id))
}

/// Highest sensitivity score; ties go to the lowest id.
fn most_sensitive<'a>(model: &'a ParsedModel, ids: &BTreeSet<String>) -> Option<&'a TechnicalAsset> {
    ids.iter()
        .filter_map(|id| model.technical_asset(id))
        .fold(None, |best: Option<&TechnicalAsset>, asset| match best {
            Some(current) if asset.sensitivity_score() <= current.sensitivity_score() => Some(current),
            _ => Some(asset),
        })
}

fn impact_of(rating: Rating) -> RiskExploitationImpact {
    if rating.is_top() {
        RiskExploitationImpact::VeryHigh
    } else if rating.is_high() {
        RiskExploitationImpact::High
    } else {
        RiskExploitationImpact::Medium
    }
}

fn title(label: Option<&str>, element: &str, guide: Option<&str>) -> String {
    let mut title = String::from("Missing Cloud Hardening");
    if let Some(label) = label {
        title.push_str(&format!(" ({label})"));
    }
    title.push_str(&format!(" risk at {element}"));
    if let Some(guide) = guide {
        title.push_str(&format!(": {guide}"));
    }
    title
}

fn runtime_risk(model: &ParsedModel, runtime: &SharedRuntime, provider: Option<&Provider>) -> Risk {
    Risk::new(
        INFO.id,
        RiskExploitationLikelihood::Unlikely,
        impact_of(Rating::of_runtime(runtime, model)),
        title(provider.map(|p| p.label), &runtime.title, provider.map(|p| p.guide)),
    )
    .shared_runtime(&runtime.id)
    .breach(DataBreachProbability::Probable, runtime.technical_assets_running.clone())
    .identified_by(&[&runtime.id])
}

fn boundary_risk(model: &ParsedModel, boundary: &TrustBoundary, provider: Option<&Provider>) -> Risk {
    Risk::new(
        INFO.id,
        RiskExploitationLikelihood::Unlikely,
        impact_of(Rating::of_boundary(boundary, model)),
        title(provider.map(|p| p.label), &boundary.title, provider.map(|p| p.guide)),
    )
    .trust_boundary(&boundary.id)
    .breach(DataBreachProbability::Probable, boundary.recursive_technical_asset_ids(model))
    .identified_by(&[&boundary.id])
}

fn asset_risk(model: &ParsedModel, asset: &TechnicalAsset, label: &str, guide: &str) -> Risk {
    Risk::new(
        INFO.id,
        RiskExploitationLikelihood::Unlikely,
        impact_of(Rating::of_asset(asset, model)),
        title(Some(label), &asset.title, Some(guide)),
    )
    .technical_asset(&asset.id)
    .breach(DataBreachProbability::Probable, vec![asset.id.clone()])
    .identified_by(&[&asset.id])
}
