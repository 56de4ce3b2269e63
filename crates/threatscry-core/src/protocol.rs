string_enum! {
    /// Wire protocol of a communication link.
    pub enum Protocol {
        UnknownProtocol => "unknown-protocol", "Unknown protocol";
        Http => "http", "HTTP protocol";
        Https => "https", "HTTPS protocol (encrypted)";
        Ws => "ws", "WebSocket";
        Wss => "wss", "WebSocket but encrypted";
        ReverseProxyWebProtocol => "reverse-proxy-web-protocol", "Protocols used by reverse proxies";
        ReverseProxyWebProtocolEncrypted => "reverse-proxy-web-protocol-encrypted", "Protocols used by reverse proxies but encrypted";
        Mqtt => "mqtt", "MQTT message protocol, encryption via TLS is optional";
        Jdbc => "jdbc", "Java Database Connectivity";
        JdbcEncrypted => "jdbc-encrypted", "Java Database Connectivity but encrypted";
        Odbc => "odbc", "Open Database Connectivity";
        OdbcEncrypted => "odbc-encrypted", "Open Database Connectivity but encrypted";
        SqlAccessProtocol => "sql-access-protocol", "SQL access protocol";
        SqlAccessProtocolEncrypted => "sql-access-protocol-encrypted", "SQL access protocol but encrypted";
        NosqlAccessProtocol => "nosql-access-protocol", "NOSQL access protocol";
        NosqlAccessProtocolEncrypted => "nosql-access-protocol-encrypted", "NOSQL access protocol but encrypted";
        Binary => "binary", "Some other binary protocol";
        BinaryEncrypted => "binary-encrypted", "Some other binary protocol, encrypted";
        Text => "text", "Some other text protocol";
        TextEncrypted => "text-encrypted", "Some other text protocol, encrypted";
        Ssh => "ssh", "Secure Shell to execute commands";
        SshTunnel => "ssh-tunnel", "Secure Shell as a tunnel";
        Smtp => "smtp", "Mail transfer protocol (sending)";
        SmtpEncrypted => "smtp-encrypted", "Mail transfer protocol (sending), encrypted";
        Pop3 => "pop3", "POP 3 mail fetching";
        Pop3Encrypted => "pop3-encrypted", "POP 3 mail fetching, encrypted";
        Imap => "imap", "IMAP mail sync protocol";
        ImapEncrypted => "imap-encrypted", "IMAP mail sync protocol, encrypted";
        Ftp => "ftp", "File Transfer Protocol";
        Ftps => "ftps", "FTP with TLS";
        Sftp => "sftp", "FTP on SSH";
        Scp => "scp", "Secure Shell to copy files";
        Ldap => "ldap", "Lightweight Directory Access Protocol, user directories";
        Ldaps => "ldaps", "Lightweight Directory Access Protocol, user directories on TLS";
        Jms => "jms", "Jakarta Messaging";
        Nfs => "nfs", "Network File System";
        Smb => "smb", "Server Message Block";
        SmbEncrypted => "smb-encrypted", "Server Message Block, but encrypted";
        LocalFileAccess => "local-file-access", "Data files are on the local system";
        Nrpe => "nrpe", "Nagios Remote Plugin Executor";
        Xmpp => "xmpp", "Extensible Messaging and Presence Protocol";
        Iiop => "iiop", "Internet Inter-ORB Protocol";
        IiopEncrypted => "iiop-encrypted", "Internet Inter-ORB Protocol, encrypted";
        Jrmp => "jrmp", "Java Remote Method Protocol";
        JrmpEncrypted => "jrmp-encrypted", "Java Remote Method Protocol, encrypted";
        InProcessLibraryCall => "in-process-library-call", "Call to local library";
        ContainerSpawning => "container-spawning", "Spawn a container";
    }
}

use Protocol::*;

impl Protocol {
    pub fn is_process_local(self) -> bool {
        matches!(self, InProcessLibraryCall | LocalFileAccess | ContainerSpawning)
    }

    pub fn is_encrypted(self) -> bool {
        matches!(
            self,
            Https
                | Wss
                | JdbcEncrypted
                | OdbcEncrypted
                | NosqlAccessProtocolEncrypted
                | SqlAccessProtocolEncrypted
                | BinaryEncrypted
                | TextEncrypted
                | Ssh
                | SshTunnel
                | Ftps
                | Sftp
                | Scp
                | Ldaps
                | ReverseProxyWebProtocolEncrypted
                | IiopEncrypted
                | JrmpEncrypted
                | SmbEncrypted
                | SmtpEncrypted
                | Pop3Encrypted
                | ImapEncrypted
        )
    }

    /// With `lax`, HTTP(S) and binary protocols count as well (REST-based NoSQL stores).
    pub fn is_potential_database_access_protocol(self, lax: bool) -> bool {
        let strict = matches!(
            self,
            Jdbc | JdbcEncrypted
                | Odbc
                | OdbcEncrypted
                | SqlAccessProtocol
                | SqlAccessProtocolEncrypted
                | NosqlAccessProtocol
                | NosqlAccessProtocolEncrypted
        );
        if lax {
            strict || matches!(self, Http | Https | Binary | BinaryEncrypted)
        } else {
            strict
        }
    }

    pub fn is_potential_web_access_protocol(self) -> bool {
        matches!(
            self,
            Http | Https | Ws | Wss | ReverseProxyWebProtocol | ReverseProxyWebProtocolEncrypted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_local_protocols_are_not_encrypted() {
        for protocol in Protocol::ALL.iter().filter(|p| p.is_process_local()) {
            assert!(!protocol.is_encrypted());
        }
    }

    #[test]
    fn lax_database_protocols_include_http() {
        assert!(!Http.is_potential_database_access_protocol(false));
        assert!(Http.is_potential_database_access_protocol(true));
        assert!(Jdbc.is_potential_database_access_protocol(false));
        assert!(!Ldap.is_potential_database_access_protocol(true));
    }

    #[test]
    fn protocol_count() {
        assert_eq!(Protocol::ALL.len(), 47);
        assert_eq!("SFTP".parse::<Protocol>().unwrap(), Sftp);
    }
}
