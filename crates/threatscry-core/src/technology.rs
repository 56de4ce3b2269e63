string_enum! {
    /// Technology of a technical asset. Drives most rule predicates.
    pub enum Technology {
        UnknownTechnology => "unknown-technology", "Unknown technology";
        ClientSystem => "client-system", "A client system";
        Browser => "browser", "A web browser";
        Desktop => "desktop", "A desktop system (or laptop)";
        MobileApp => "mobile-app", "A mobile app (smartphone, tablet)";
        DevOpsClient => "devops-client", "A client used for DevOps";
        WebServer => "web-server", "A web server";
        WebApplication => "web-application", "A web application";
        ApplicationServer => "application-server", "An application server (Apache Tomcat, ...)";
        Database => "database", "A database";
        FileServer => "file-server", "A file server";
        LocalFileSystem => "local-file-system", "The local file system";
        Erp => "erp", "Enterprise-Resource-Planning";
        Cms => "cms", "Content Management System";
        WebServiceRest => "web-service-rest", "A REST web service (API)";
        WebServiceSoap => "web-service-soap", "A SOAP web service (API)";
        Ejb => "ejb", "Jakarta Enterprise Beans fka Enterprise JavaBeans";
        SearchIndex => "search-index", "The index database of a search engine";
        SearchEngine => "search-engine", "A search engine";
        ServiceRegistry => "service-registry", "A central place where data schemas can be found and distributed";
        ReverseProxy => "reverse-proxy", "A proxy hiding internal infrastructure from callers";
        LoadBalancer => "load-balancer", "A load balancer directing incoming requests to internal infrastructure";
        BuildPipeline => "build-pipeline", "A software build pipeline";
        SourcecodeRepository => "sourcecode-repository", "Git or similar";
        ArtifactRegistry => "artifact-registry", "A registry to store build artifacts";
        CodeInspectionPlatform => "code-inspection-platform", "(Static) code analysis";
        Monitoring => "monitoring", "A monitoring system (SIEM, logs)";
        LdapServer => "ldap-server", "A LDAP server";
        ContainerPlatform => "container-platform", "A platform for hosting and executing containers";
        BatchProcessing => "batch-processing", "A set of tools automatically processing data";
        EventListener => "event-listener", "An event listener waiting to be triggered";
        IdentityProvider => "identity-provider", "An authentication provider";
        IdentityStoreLdap => "identity-store-ldap", "Authentication data as LDAP";
        IdentityStoreDatabase => "identity-store-database", "Authentication data as database";
        Tool => "tool", "A specific tool";
        Cli => "cli", "A command line tool";
        Task => "task", "A specific task";
        Function => "function", "A specific function (maybe RPC)";
        Gateway => "gateway", "A gateway connecting two systems or trust boundaries";
        IotDevice => "iot-device", "An IoT device";
        MessageQueue => "message-queue", "A message queue (like MQTT)";
        StreamProcessing => "stream-processing", "Data stream processing";
        ServiceMesh => "service-mesh", "Infrastructure for service-to-service communication";
        DataLake => "data-lake", "A huge database";
        BigDataPlatform => "big-data-platform", "Storage for big data";
        ReportEngine => "report-engine", "Software for report generation";
        Ai => "ai", "An artificial intelligence service";
        MailServer => "mail-server", "A mail server";
        Vault => "vault", "Encryption and key management";
        Hsm => "hsm", "Hardware security module";
        Waf => "waf", "Web application firewall";
        Ids => "ids", "Intrusion detection system";
        Ips => "ips", "Intrusion prevention system";
        Scheduler => "scheduler", "Scheduled tasks";
        Mainframe => "mainframe", "A central, big computer";
        BlockStorage => "block-storage", "SAN or similar central file storage";
        Library => "library", "A software library";
    }
}

use Technology::*;

impl Technology {
    pub fn is_web_application(self) -> bool {
        matches!(
            self,
            WebServer | WebApplication | ApplicationServer | Erp | Cms | IdentityProvider | ReportEngine
        )
    }

    pub fn is_web_service(self) -> bool {
        matches!(self, WebServiceRest | WebServiceSoap)
    }

    pub fn is_identity_related(self) -> bool {
        matches!(self, IdentityProvider | IdentityStoreLdap | IdentityStoreDatabase)
    }

    pub fn is_identity_store(self) -> bool {
        matches!(self, IdentityStoreLdap | IdentityStoreDatabase)
    }

    pub fn is_security_control_related(self) -> bool {
        matches!(self, Vault | Hsm | Waf | Ids | Ips)
    }

    pub fn is_unprotected_comms_tolerated(self) -> bool {
        matches!(self, Monitoring | Ids | Ips)
    }

    pub fn is_unnecessary_data_tolerated(self) -> bool {
        matches!(self, Monitoring | Ids | Ips)
    }

    pub fn is_close_to_high_value_targets_tolerated(self) -> bool {
        matches!(self, Monitoring | Ids | Ips | LoadBalancer | ReverseProxy)
    }

    pub fn is_client(self) -> bool {
        matches!(
            self,
            ClientSystem | Browser | Desktop | MobileApp | DevOpsClient | IotDevice
        )
    }

    pub fn is_usually_able_to_propagate_identity_to_outgoing_targets(self) -> bool {
        matches!(
            self,
            ClientSystem
                | Browser
                | Desktop
                | MobileApp
                | DevOpsClient
                | WebServer
                | WebApplication
                | ApplicationServer
                | Erp
                | Cms
                | WebServiceRest
                | WebServiceSoap
                | Ejb
                | SearchEngine
                | ReverseProxy
                | LoadBalancer
                | IdentityProvider
                | Tool
                | Cli
                | Task
                | Function
                | Gateway
                | IotDevice
                | MessageQueue
                | ServiceMesh
                | ReportEngine
                | Waf
                | Library
        )
    }

    pub fn is_less_protected_type(self) -> bool {
        matches!(
            self,
            ClientSystem
                | Browser
                | Desktop
                | MobileApp
                | DevOpsClient
                | WebServer
                | WebApplication
                | ApplicationServer
                | Cms
                | WebServiceRest
                | WebServiceSoap
                | Ejb
                | BuildPipeline
                | SourcecodeRepository
                | ArtifactRegistry
                | CodeInspectionPlatform
                | Monitoring
                | IotDevice
                | Ai
                | MailServer
                | Scheduler
                | Mainframe
        )
    }

    pub fn is_usually_processing_enduser_requests(self) -> bool {
        matches!(
            self,
            WebServer
                | WebApplication
                | ApplicationServer
                | Erp
                | WebServiceRest
                | WebServiceSoap
                | Ejb
                | ReportEngine
        )
    }

    pub fn is_usually_storing_enduser_data(self) -> bool {
        matches!(
            self,
            Database
                | Erp
                | FileServer
                | LocalFileSystem
                | BlockStorage
                | MailServer
                | StreamProcessing
                | MessageQueue
        )
    }

    pub fn is_exclusively_frontend_related(self) -> bool {
        matches!(
            self,
            ClientSystem
                | Browser
                | Desktop
                | MobileApp
                | DevOpsClient
                | Cms
                | ReverseProxy
                | Waf
                | LoadBalancer
                | Gateway
                | IotDevice
        )
    }

    pub fn is_exclusively_backend_related(self) -> bool {
        matches!(
            self,
            Database
                | IdentityProvider
                | IdentityStoreLdap
                | IdentityStoreDatabase
                | Erp
                | WebServiceRest
                | WebServiceSoap
                | Ejb
                | SearchIndex
                | SearchEngine
                | ContainerPlatform
                | BatchProcessing
                | EventListener
                | DataLake
                | BigDataPlatform
                | MessageQueue
                | StreamProcessing
                | ServiceMesh
                | Vault
                | Hsm
                | Scheduler
                | Mainframe
                | FileServer
                | BlockStorage
        )
    }

    pub fn is_development_relevant(self) -> bool {
        matches!(
            self,
            BuildPipeline | SourcecodeRepository | ArtifactRegistry | CodeInspectionPlatform | DevOpsClient
        )
    }

    pub fn is_traffic_forwarding(self) -> bool {
        matches!(self, LoadBalancer | ReverseProxy | Waf)
    }

    pub fn is_embedded_component(self) -> bool {
        self == Library
    }
}
