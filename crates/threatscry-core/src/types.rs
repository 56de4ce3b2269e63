// --- Ratings ---

string_enum! {
    /// How many instances of a data asset exist.
    pub enum Quantity {
        VeryFew => "very-few", "Very few";
        Few => "few", "Few";
        Many => "many", "Many";
        VeryMany => "very-many", "Very many";
    }
}

impl Quantity {
    pub fn factor(self) -> f64 {
        [1.0, 2.0, 3.0, 5.0][self.ordinal()]
    }
}

string_enum! {
    /// Protection need for confidentiality, lowest first.
    pub enum Confidentiality {
        Public => "public", "Public available information";
        Internal => "internal", "(Company) internal information, all people in the institution can access it";
        Restricted => "restricted", "Internal and with restricted access";
        Confidential => "confidential", "Only a few selected people have access";
        StrictlyConfidential => "strictly-confidential", "Highest secrecy level";
    }
}

impl Confidentiality {
    pub fn attractiveness_for_asset(self) -> f64 {
        [8.0, 13.0, 21.0, 34.0, 55.0][self.ordinal()]
    }

    pub fn attractiveness_for_processed_or_stored_data(self) -> f64 {
        [5.0, 8.0, 13.0, 21.0, 34.0][self.ordinal()]
    }

    pub fn attractiveness_for_transferred_data(self) -> f64 {
        [2.0, 3.0, 5.0, 8.0, 13.0][self.ordinal()]
    }
}

string_enum! {
    /// Protection need for integrity and availability, lowest first.
    pub enum Criticality {
        Archive => "archive", "Stored, not active";
        Operational => "operational", "If this fails, people will just have an ad-hoc coffee break until it is back";
        Important => "important", "Issues here result in angry people";
        Critical => "critical", "Failure is really expensive or crippling";
        MissionCritical => "mission-critical", "This must not fail";
    }
}

impl Criticality {
    pub fn attractiveness_for_asset(self) -> f64 {
        [5.0, 8.0, 13.0, 21.0, 34.0][self.ordinal()]
    }

    pub fn attractiveness_for_processed_or_stored_data(self) -> f64 {
        [3.0, 5.0, 8.0, 13.0, 21.0][self.ordinal()]
    }

    pub fn attractiveness_for_transferred_data(self) -> f64 {
        [2.0, 3.0, 5.0, 8.0, 13.0][self.ordinal()]
    }
}

// --- Technical asset attributes ---

string_enum! {
    pub enum TechnicalAssetType {
        ExternalEntity => "external-entity", "This asset is hosted and managed by a third party";
        Process => "process", "A software process";
        Datastore => "datastore", "This asset stores data";
    }
}

string_enum! {
    pub enum TechnicalAssetSize {
        System => "system", "A system consists of several services";
        Service => "service", "A specific service (web, mail, ...)";
        Application => "application", "A single application";
        Component => "component", "A component of an application (smaller unit like a microservice)";
    }
}

string_enum! {
    pub enum Machine {
        Physical => "physical", "A physical machine";
        Virtual => "virtual", "A virtual machine";
        Container => "container", "A container";
        Serverless => "serverless", "A serverless application";
    }
}

string_enum! {
    pub enum EncryptionStyle {
        None => "none", "No encryption";
        Transparent => "transparent", "Encrypted data at rest";
        DataWithSymmetricSharedKey => "data-with-symmetric-shared-key", "Both communication partners have the same key";
        DataWithAsymmetricSharedKey => "data-with-asymmetric-shared-key", "The key is split into public and private, shared between partners";
        DataWithEnduserIndividualKey => "data-with-enduser-individual-key", "The key is (managed) by the end user";
    }
}

string_enum! {
    pub enum Usage {
        Business => "business", "This system is operational and does business tasks";
        DevOps => "devops", "This system is for development and/or deployment or other operational tasks";
    }
}

string_enum! {
    pub enum DataFormat {
        Json => "json", "JSON";
        Xml => "xml", "XML";
        Serialization => "serialization", "Serialized program objects";
        File => "file", "Specific file types for data";
        Csv => "csv", "CSV";
    }
}

// --- Communication link attributes ---

string_enum! {
    pub enum Authentication {
        None => "none", "No authentication";
        Credentials => "credentials", "Username and password, pin or passphrase";
        SessionId => "session-id", "A server generated session id with limited life span";
        Token => "token", "A server generated token, cryptographically signed";
        ClientCertificate => "client-certificate", "A certificate file stored on the client identifying this specific client";
        TwoFactor => "two-factor", "Credentials plus another factor like a physical object (card) or biometrics";
        Externalized => "externalized", "Some external company handles authentication";
    }
}

string_enum! {
    pub enum Authorization {
        None => "none", "No authorization";
        TechnicalUser => "technical-user", "Technical user (service-to-service) like DB user credentials";
        EnduserIdentityPropagation => "enduser-identity-propagation", "Identity of end user propagates to this service";
    }
}

// --- Trust boundaries ---

string_enum! {
    pub enum TrustBoundaryType {
        NetworkOnPrem => "network-on-prem", "The whole network is on prem";
        NetworkDedicatedHoster => "network-dedicated-hoster", "The network is at a dedicated hoster";
        NetworkVirtualLan => "network-virtual-lan", "Network is a VLAN";
        NetworkCloudProvider => "network-cloud-provider", "Network is at a cloud provider";
        NetworkCloudSecurityGroup => "network-cloud-security-group", "Cloud rules controlling network traffic";
        NetworkPolicyNamespaceIsolation => "network-policy-namespace-isolation", "Segregation in a Kubernetes cluster";
        ExecutionEnvironment => "execution-environment", "Logical group of items, not a protective network boundary";
    }
}

impl TrustBoundaryType {
    pub fn is_network_boundary(self) -> bool {
        self != TrustBoundaryType::ExecutionEnvironment
    }

    pub fn is_within_cloud(self) -> bool {
        matches!(
            self,
            TrustBoundaryType::NetworkCloudProvider | TrustBoundaryType::NetworkCloudSecurityGroup
        )
    }
}

// --- Risks ---

string_enum! {
    pub enum DataBreachProbability {
        Improbable => "improbable", "Improbable";
        Possible => "possible", "Possible";
        Probable => "probable", "Probable";
    }
}

string_enum! {
    pub enum RiskSeverity {
        Low => "low", "Low";
        Medium => "medium", "Medium";
        Elevated => "elevated", "Elevated";
        High => "high", "High";
        Critical => "critical", "Critical";
    }
}

string_enum! {
    pub enum RiskExploitationLikelihood {
        Unlikely => "unlikely", "Unlikely";
        Likely => "likely", "Likely";
        VeryLikely => "very-likely", "Very likely";
        Frequent => "frequent", "Frequent";
    }
}

impl RiskExploitationLikelihood {
    pub fn weight(self) -> u32 {
        self.ordinal() as u32 + 1
    }
}

string_enum! {
    pub enum RiskExploitationImpact {
        Low => "low", "Low";
        Medium => "medium", "Medium";
        High => "high", "High";
        VeryHigh => "very-high", "Very high";
    }
}

impl RiskExploitationImpact {
    pub fn weight(self) -> u32 {
        self.ordinal() as u32 + 1
    }
}

string_enum! {
    pub enum RiskFunction {
        BusinessSide => "business-side", "Business";
        Architecture => "architecture", "Architecture";
        Development => "development", "Development";
        Operations => "operations", "Operations";
    }
}

string_enum! {
    pub enum Stride {
        Spoofing => "spoofing", "Spoofing - Authenticity";
        Tampering => "tampering", "Tampering - Integrity";
        Repudiation => "repudiation", "Repudiation - Non-repudiability";
        InformationDisclosure => "information-disclosure", "Information disclosure - Confidentiality";
        DenialOfService => "denial-of-service", "Denial of service - Availability";
        ElevationOfPrivilege => "elevation-of-privilege", "Elevation of privilege - Authorization";
    }
}

string_enum! {
    pub enum RiskStatus {
        Unchecked => "unchecked", "Risk has not yet been reviewed";
        InDiscussion => "in-discussion", "Risk is currently being discussed (during review)";
        Accepted => "accepted", "Risk has been accepted";
        InProgress => "in-progress", "Risk mitigation is currently in progress";
        Mitigated => "mitigated", "Risk has been mitigated";
        FalsePositive => "false-positive", "Risk is a false positive (not applicable)";
    }
}

impl RiskStatus {
    pub fn is_still_at_risk(self) -> bool {
        matches!(
            self,
            RiskStatus::Unchecked
                | RiskStatus::InDiscussion
                | RiskStatus::Accepted
                | RiskStatus::InProgress
        )
    }
}

impl Default for RiskStatus {
    fn default() -> Self {
        RiskStatus::Unchecked
    }
}

/// Canonical values of every closed value set, keyed by a human label.
pub fn all_value_sets() -> Vec<(&'static str, Vec<(&'static str, &'static str)>)> {
    fn values<T: Copy>(
        all: &[T],
        as_str: fn(T) -> &'static str,
        description: fn(T) -> &'static str,
    ) -> Vec<(&'static str, &'static str)> {
        all.iter().map(|v| (as_str(*v), description(*v))).collect()
    }

    use crate::protocol::Protocol;
    use crate::technology::Technology;

    vec![
        ("quantity", values(Quantity::ALL, Quantity::as_str, Quantity::description)),
        ("confidentiality", values(Confidentiality::ALL, Confidentiality::as_str, Confidentiality::description)),
        ("criticality", values(Criticality::ALL, Criticality::as_str, Criticality::description)),
        ("technical asset type", values(TechnicalAssetType::ALL, TechnicalAssetType::as_str, TechnicalAssetType::description)),
        ("technical asset size", values(TechnicalAssetSize::ALL, TechnicalAssetSize::as_str, TechnicalAssetSize::description)),
        ("technical asset technology", values(Technology::ALL, Technology::as_str, Technology::description)),
        ("technical asset machine", values(Machine::ALL, Machine::as_str, Machine::description)),
        ("encryption style", values(EncryptionStyle::ALL, EncryptionStyle::as_str, EncryptionStyle::description)),
        ("usage", values(Usage::ALL, Usage::as_str, Usage::description)),
        ("data format", values(DataFormat::ALL, DataFormat::as_str, DataFormat::description)),
        ("protocol", values(Protocol::ALL, Protocol::as_str, Protocol::description)),
        ("authentication", values(Authentication::ALL, Authentication::as_str, Authentication::description)),
        ("authorization", values(Authorization::ALL, Authorization::as_str, Authorization::description)),
        ("trust boundary type", values(TrustBoundaryType::ALL, TrustBoundaryType::as_str, TrustBoundaryType::description)),
        ("data breach probability", values(DataBreachProbability::ALL, DataBreachProbability::as_str, DataBreachProbability::description)),
        ("risk severity", values(RiskSeverity::ALL, RiskSeverity::as_str, RiskSeverity::description)),
        ("risk exploitation likelihood", values(RiskExploitationLikelihood::ALL, RiskExploitationLikelihood::as_str, RiskExploitationLikelihood::description)),
        ("risk exploitation impact", values(RiskExploitationImpact::ALL, RiskExploitationImpact::as_str, RiskExploitationImpact::description)),
        ("risk function", values(RiskFunction::ALL, RiskFunction::as_str, RiskFunction::description)),
        ("stride", values(Stride::ALL, Stride::as_str, Stride::description)),
        ("risk status", values(RiskStatus::ALL, RiskStatus::as_str, RiskStatus::description)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_strings_case_insensitively() {
        assert_eq!("strictly-confidential".parse::<Confidentiality>().unwrap(), Confidentiality::StrictlyConfidential);
        assert_eq!(" Mission-Critical ".parse::<Criticality>().unwrap(), Criticality::MissionCritical);
        assert_eq!("devops".parse::<Usage>().unwrap(), Usage::DevOps);
    }

    #[test]
    fn unknown_value_reports_the_raw_text() {
        let err = "top-secret".parse::<Confidentiality>().unwrap_err();
        assert_eq!(err.value, "top-secret");
        assert_eq!(err.kind, "Confidentiality");
    }

    #[test]
    fn ordering_follows_scale() {
        assert!(Confidentiality::Public < Confidentiality::Internal);
        assert!(Confidentiality::Confidential < Confidentiality::StrictlyConfidential);
        assert!(Criticality::Archive < Criticality::MissionCritical);
        assert!(RiskSeverity::Elevated > RiskSeverity::Medium);
    }

    #[test]
    fn serde_uses_canonical_strings() {
        let json = serde_json::to_string(&EncryptionStyle::DataWithEnduserIndividualKey).unwrap();
        assert_eq!(json, "\"data-with-enduser-individual-key\"");
        let back: RiskStatus = serde_json::from_str("\"false-positive\"").unwrap();
        assert_eq!(back, RiskStatus::FalsePositive);
    }

    #[test]
    fn still_at_risk_statuses() {
        let open: Vec<_> = RiskStatus::ALL.iter().filter(|s| s.is_still_at_risk()).collect();
        assert_eq!(open.len(), 4);
        assert!(!RiskStatus::Mitigated.is_still_at_risk());
        assert!(!RiskStatus::FalsePositive.is_still_at_risk());
    }

    #[test]
    fn weights_start_at_one() {
        assert_eq!(RiskExploitationLikelihood::Unlikely.weight(), 1);
        assert_eq!(RiskExploitationLikelihood::Frequent.weight(), 4);
        assert_eq!(RiskExploitationImpact::VeryHigh.weight(), 4);
    }
}
