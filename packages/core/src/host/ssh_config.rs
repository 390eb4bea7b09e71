//! ssh_config rendering
//!
//! Serializes resolved hosts into the text format understood by `ssh -F`.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::schema::Host;

/// Keywords accepted as host parameters, matched case-insensitively
const SSH_KEYWORDS: &[&str] = &[
    "AddKeysToAgent",
    "AddressFamily",
    "BatchMode",
    "BindAddress",
    "BindInterface",
    "CanonicalDomains",
    "CanonicalizeFallbackLocal",
    "CanonicalizeHostname",
    "CanonicalizeMaxDots",
    "CanonicalizePermittedCNAMEs",
    "CASignatureAlgorithms",
    "CertificateFile",
    "ChallengeResponseAuthentication",
    "CheckHostIP",
    "Ciphers",
    "ClearAllForwardings",
    "Compression",
    "ConnectionAttempts",
    "ConnectTimeout",
    "ControlMaster",
    "ControlPath",
    "ControlPersist",
    "DynamicForward",
    "EnableEscapeCommandline",
    "EnableSSHKeysign",
    "EscapeChar",
    "ExitOnForwardFailure",
    "FingerprintHash",
    "ForkAfterAuthentication",
    "ForwardAgent",
    "ForwardX11",
    "ForwardX11Timeout",
    "ForwardX11Trusted",
    "GatewayPorts",
    "GlobalKnownHostsFile",
    "GSSAPIAuthentication",
    "GSSAPIDelegateCredentials",
    "HashKnownHosts",
    "HostbasedAcceptedAlgorithms",
    "HostbasedAuthentication",
    "HostKeyAlgorithms",
    "HostKeyAlias",
    "HostName",
    "IdentitiesOnly",
    "IdentityAgent",
    "IdentityFile",
    "IgnoreUnknown",
    "Include",
    "IPQoS",
    "KbdInteractiveAuthentication",
    "KbdInteractiveDevices",
    "KexAlgorithms",
    "KnownHostsCommand",
    "LocalCommand",
    "LocalForward",
    "LogLevel",
    "LogVerbose",
    "MACs",
    "NoHostAuthenticationForLocalhost",
    "NumberOfPasswordPrompts",
    "PasswordAuthentication",
    "PermitLocalCommand",
    "PermitRemoteOpen",
    "PKCS11Provider",
    "Port",
    "PreferredAuthentications",
    "ProxyCommand",
    "ProxyJump",
    "ProxyUseFdpass",
    "PubkeyAcceptedAlgorithms",
    "PubkeyAcceptedKeyTypes",
    "PubkeyAuthentication",
    "RekeyLimit",
    "RemoteCommand",
    "RemoteForward",
    "RequestTTY",
    "RequiredRSASize",
    "RevokedHostKeys",
    "SecurityKeyProvider",
    "SendEnv",
    "ServerAliveCountMax",
    "ServerAliveInterval",
    "SessionType",
    "SetEnv",
    "StdinNull",
    "StreamLocalBindMask",
    "StreamLocalBindUnlink",
    "StrictHostKeyChecking",
    "SyslogFacility",
    "TCPKeepAlive",
    "Tag",
    "Tunnel",
    "TunnelDevice",
    "UpdateHostKeys",
    "User",
    "UserKnownHostsFile",
    "VerifyHostKeyDNS",
    "VisualHostKey",
    "XAuthLocation",
];

/// Check whether `key` names an ssh_config keyword
pub fn is_ssh_keyword(key: &str) -> bool {
    SSH_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Render hosts into ssh_config text
///
/// One `Host` block per host in the given order, parameters sorted by key and
/// indented four spaces, blocks separated by a blank line.
pub fn render_ssh_config<'a, I>(hosts: I) -> String
where
    I: IntoIterator<Item = &'a Host>,
{
    let blocks: Vec<String> = hosts
        .into_iter()
        .map(|host| {
            let mut block = format!("Host {}\n", host.name);
            for (key, value) in &host.params {
                block.push_str(&format!("    {key} {value}\n"));
            }
            block
        })
        .collect();

    blocks.join("\n")
}

/// Write rendered ssh_config content to `path`
///
/// Creates the parent directory when missing. The file is created with
/// mode 600 on Unix since it may carry identity file paths and proxy commands.
pub fn write_ssh_config(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create ssh config: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write ssh config: {}", path.display()))?;

    tracing::info!("Wrote ssh config to {}", path.display());
    Ok(())
}

/// Distinct tags across hosts, sorted
pub fn collect_tags<'a, I>(hosts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Host>,
{
    hosts
        .into_iter()
        .flat_map(|host| host.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
