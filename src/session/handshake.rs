//! Handshake response parsing
//!
//! The handshake endpoint replies with a newline-delimited text blob of
//! prefixed fields. Prefix matching is case-exact; `SSHHostkey: ` is
//! spelled with a lowercase k on the wire and that spelling is part of the
//! protocol.

/// Expected response lines:
///
/// ```text
/// Upgrade: <url>          (zero or one)
/// PSK: <hexstring>        (zero or one)
/// SSHPort: <string>       (zero or one)
/// SSHUsername: <string>   (zero or one)
/// SSHPassword: <string>   (zero or one)
/// SSHHostkey: <string>    (zero or one)
/// Homepage: <url>         (zero or more)
/// Server: <hexstring>     (zero or more)
/// ```
const UPGRADE_PREFIX: &str = "Upgrade: ";
const PSK_PREFIX: &str = "PSK: ";
const SSH_PORT_PREFIX: &str = "SSHPort: ";
const SSH_USERNAME_PREFIX: &str = "SSHUsername: ";
const SSH_PASSWORD_PREFIX: &str = "SSHPassword: ";
const SSH_HOST_KEY_PREFIX: &str = "SSHHostkey: ";
const HOMEPAGE_PREFIX: &str = "Homepage: ";
const SERVER_PREFIX: &str = "Server: ";

/// Fields extracted from one handshake response.
///
/// Parsing never fails: unknown and blank lines are skipped, missing
/// fields stay empty. Semantic validation (a non-blank PSK, a numeric
/// port) is the caller's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub upgrade_version: String,
    pub psk: String,
    pub ssh_port: String,
    pub ssh_username: String,
    pub ssh_password: String,
    pub ssh_host_key: String,
    pub homepages: Vec<String>,
    pub servers: Vec<String>,
}

impl HandshakeResponse {
    /// Extract fields from a response blob. Every parse starts from empty
    /// fields; repeated single-valued lines keep the last value.
    pub fn parse(response: &str) -> Self {
        let mut parsed = Self::default();

        for line in response.split('\n') {
            if let Some(value) = line.strip_prefix(UPGRADE_PREFIX) {
                parsed.upgrade_version = value.to_string();
            } else if let Some(value) = line.strip_prefix(PSK_PREFIX) {
                parsed.psk = value.to_string();
            } else if let Some(value) = line.strip_prefix(SSH_PORT_PREFIX) {
                parsed.ssh_port = value.to_string();
            } else if let Some(value) = line.strip_prefix(SSH_USERNAME_PREFIX) {
                parsed.ssh_username = value.to_string();
            } else if let Some(value) = line.strip_prefix(SSH_PASSWORD_PREFIX) {
                parsed.ssh_password = value.to_string();
            } else if let Some(value) = line.strip_prefix(SSH_HOST_KEY_PREFIX) {
                parsed.ssh_host_key = value.to_string();
            } else if let Some(value) = line.strip_prefix(HOMEPAGE_PREFIX) {
                parsed.homepages.push(value.to_string());
            } else if let Some(value) = line.strip_prefix(SERVER_PREFIX) {
                parsed.servers.push(value.to_string());
            }
        }

        parsed
    }
}
