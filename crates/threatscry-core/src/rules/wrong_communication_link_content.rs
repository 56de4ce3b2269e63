use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::model::{CommunicationLink, TechnicalAsset};
use crate::protocol::Protocol;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, Machine, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride,
};

use super::RuleInfo;

const INFO: RuleInfo = RuleInfo {
    id: "wrong-communication-link-content",
    title: "Wrong Communication Link Content",
    description: "When a communication link is defined as readonly, but does not receive any data asset, or when it is defined as not readonly, but does not send any data asset, it is likely to be a model failure.",
    impact: "If this potential model error is not fixed, some risks might not be visible.",
    asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Threat_Modeling_Cheat_Sheet.html",
    action: "Model Consistency",
    mitigation: "Try to model the correct readonly flag and/or data sent/received of communication links. Also try to use communication link types matching the target technology/machine types.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
    function: RiskFunction::Architecture,
    stride: Stride::InformationDisclosure,
    detection_logic: "Communication links with inconsistent data assets being sent/received not matching their readonly flag or otherwise inconsistent protocols not matching the target technology type.",
    risk_assessment: "low",
    false_positives: "Usually no false positives as this looks like an incomplete model.",
    model_failure_possible_reason: true,
    cwe: 1008,
};

pub struct WrongCommunicationLinkContent;

impl RiskRule for WrongCommunicationLinkContent {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        let mut risks = Vec::new();
        for asset in model.technical_assets.values() {
            for link in &asset.communication_links {
                let Some(target) = model.technical_asset(&link.target_id) else {
                    continue;
                };
                let reasons = mismatches(link, target);
                if reasons.is_empty() {
                    continue;
                }
                risks.push(
                    Risk::new(
                        INFO.id,
                        RiskExploitationLikelihood::Unlikely,
                        RiskExploitationImpact::Low,
                        format!(
                            "Wrong Communication Link Content {} at {} regarding communication link {}",
                            reasons.join(" "),
                            asset.title,
                            link.title
                        ),
                    )
                    .technical_asset(&asset.id)
                    .communication_link(&link.id)
                    .breach(DataBreachProbability::Improbable, Vec::new())
                    .identified_by(&[&asset.id, &link.id]),
                );
            }
        }
        Ok(risks)
    }
}

/// Every inconsistency of one link, in a fixed order.
fn mismatches(link: &CommunicationLink, target: &TechnicalAsset) -> Vec<String> {
    let mut reasons = Vec::new();
    let direction_empty = if link.readonly {
        link.data_assets_received.is_empty()
    } else {
        link.data_assets_sent.is_empty()
    };
    if direction_empty {
        reasons.push("(data assets sent/received not matching the communication link's readonly flag)".to_string());
    }
    let expected_technology = match link.protocol {
        Protocol::InProcessLibraryCall => Some(Technology::Library),
        Protocol::LocalFileAccess => Some(Technology::LocalFileSystem),
        _ => None,
    };
    if let Some(expected) = expected_technology.filter(|expected| *expected != target.technology) {
        reasons.push(format!(
            "(protocol type \"{}\" does not match target technology type \"{}\": expected \"{}\")",
            link.protocol, target.technology, expected
        ));
    }
    if link.protocol == Protocol::ContainerSpawning && target.machine != Machine::Container {
        reasons.push(format!(
            "(protocol type \"{}\" does not match target machine type \"{}\": expected \"{}\")",
            link.protocol,
            target.machine,
            Machine::Container
        ));
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, ids, link, run, Fixture};

    #[test]
    fn reasons_are_merged_per_link() {
        let mut read = link("app", "Read Config", "disk", Protocol::LocalFileAccess);
        read.readonly = true;
        read.data_assets_received = vec!["config".to_string()];
        let mut spawn = link("orchestrator", "Spawn", "worker", Protocol::ContainerSpawning);
        spawn.data_assets_sent = vec!["jobs".to_string()];
        let mut call = link("app", "Call", "lib", Protocol::InProcessLibraryCall);
        call.data_assets_sent = vec!["jobs".to_string()];
        let mut worker = asset("worker", Technology::Task);
        worker.machine = Machine::Container;
        let model = Fixture::new()
            .asset(asset("app", Technology::WebApplication))
            .asset(asset("disk", Technology::FileServer))
            .asset(asset("lib", Technology::Library))
            .asset(asset("orchestrator", Technology::ContainerPlatform))
            .asset(worker)
            .link(read)
            .link(spawn)
            .link(call)
            .build();

        let risks = run(&WrongCommunicationLinkContent, model);
        assert_eq!(
            ids(&risks),
            vec!["wrong-communication-link-content@app@app>read-config"]
        );
        assert_eq!(
            risks[0].title,
            "Wrong Communication Link Content (protocol type \"local-file-access\" does not match target \
             technology type \"file-server\": expected \"local-file-system\") at app regarding communication link Read Config"
        );
    }

    #[test]
    fn empty_write_link_on_wrong_machine() {
        let model = Fixture::new()
            .asset(asset("orchestrator", Technology::ContainerPlatform))
            .asset(asset("vm", Technology::Task))
            .link(link("orchestrator", "Spawn", "vm", Protocol::ContainerSpawning))
            .build();

        let risks = run(&WrongCommunicationLinkContent, model);
        assert_eq!(risks.len(), 1);
        assert_eq!(
            risks[0].title,
            "Wrong Communication Link Content (data assets sent/received not matching the communication link's \
             readonly flag) (protocol type \"container-spawning\" does not match target machine type \"virtual\": \
             expected \"container\") at orchestrator regarding communication link Spawn"
        );
        assert!(risks[0].data_breach_technical_assets.is_empty());
    }
}
