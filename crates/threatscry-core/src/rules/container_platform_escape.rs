use crate::engine::{AnalysisContext, RiskRule};
use crate::error::RuleError;
use crate::risk::{Risk, RiskCategory};
use crate::technology::Technology;
use crate::types::{
    DataBreachProbability, Machine, RiskExploitationImpact, RiskExploitationLikelihood,
    RiskFunction, Stride,
};

use super::{Rating, RuleInfo};

const INFO: RuleInfo = RuleInfo {
    id: "container-platform-escape",
    title: "Container Platform Escape",
    description: "Container platforms are especially interesting targets for attackers as they host big parts of a containerized runtime infrastructure. When not configured and operated with security best practices in mind, attackers might exploit a vulnerability inside an container and escape towards the platform as highly privileged users. These scenarios might give attackers capabilities to attack every other container as owning the container platform (via container escape attacks) equals to owning every container.",
    impact: "If this risk is unmitigated, attackers which have successfully compromised a container (via other vulnerabilities) might be able to deeply persist in the target system by executing code in many deployed containers and the container platform itself.",
    asvs: "V14 - Configuration Verification Requirements",
    cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Docker_Security_Cheat_Sheet.html",
    action: "Container Infrastructure Hardening",
    mitigation: "Apply hardening of all container infrastructures. See for example the CIS-Benchmarks for Docker and Kubernetes as well as the Docker Bench for Security ( https://github.com/docker/docker-bench-security ) or InSpec Checks for Docker and Kubernetes ( https://github.com/dev-sec/cis-docker-benchmark and https://github.com/dev-sec/cis-kubernetes-benchmark ). Use only trusted base images, verify digital signatures and apply image creation best practices. Also consider using Google's Distroless base images or otherwise very small base images. Apply namespace isolation and nod affinity to separate pods from each other in terms of access and nodes the same style as you separate data.",
    check: "Are recommendations from the linked cheat sheet and referenced ASVS or CSVS chapter applied?",
    function: RiskFunction::Operations,
    stride: Stride::ElevationOfPrivilege,
    detection_logic: "In-scope container platforms.",
    risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
    false_positives: "Container platforms not running parts of the target architecture can be considered as false positives after individual review.",
    model_failure_possible_reason: false,
    cwe: 1008,
};

pub struct ContainerPlatformEscape;

impl RiskRule for ContainerPlatformEscape {
    fn category(&self) -> RiskCategory {
        INFO.category()
    }

    fn supported_tags(&self) -> Vec<String> {
        super::tags(&["docker", "kubernetes", "openshift"])
    }

    fn generate_risks(&self, ctx: &AnalysisContext) -> Result<Vec<Risk>, RuleError> {
        let model = ctx.model();
        // An escape exposes every container, whichever platform runs it.
        let containers: Vec<String> = model
            .technical_assets
            .values()
            .filter(|asset| asset.machine == Machine::Container)
            .map(|asset| asset.id.clone())
            .collect();

        Ok(model
            .in_scope_technical_assets()
            .filter(|asset| asset.technology == Technology::ContainerPlatform)
            .map(|platform| {
                let impact = if Rating::of_asset(platform, model).is_top() {
                    RiskExploitationImpact::High
                } else {
                    RiskExploitationImpact::Medium
                };
                Risk::new(
                    INFO.id,
                    RiskExploitationLikelihood::Unlikely,
                    impact,
                    format!("Container Platform Escape risk at {}", platform.title),
                )
                .technical_asset(&platform.id)
                .breach(DataBreachProbability::Probable, containers.clone())
                .identified_by(&[&platform.id])
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{asset, ids, run, Fixture};

    #[test]
    fn breach_covers_all_containers_in_id_order() {
        let mut web = asset("web", Technology::WebServer);
        web.machine = Machine::Container;
        let mut api = asset("api", Technology::WebServiceRest);
        api.machine = Machine::Container;
        let model = Fixture::new()
            .asset(asset("k8s", Technology::ContainerPlatform))
            .asset(web)
            .asset(api)
            .asset(asset("vm", Technology::Database))
            .build();
        let risks = run(&ContainerPlatformEscape, model);
        assert_eq!(ids(&risks), vec!["container-platform-escape@k8s"]);
        assert_eq!(risks[0].data_breach_technical_assets, vec!["api", "web"]);
        assert_eq!(risks[0].exploitation_impact, RiskExploitationImpact::Medium);
    }
}
