//! SSH algorithm tables, timeouts and run settings.
//!
//! Lab routers (IOSv, CSR1000v, vEOS) often ship old SSH stacks, so besides
//! a modern profile there is a legacy profile that keeps SHA-1 key exchange
//! and CBC ciphers available.

use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use async_ssh2_tokio::ServerCheckMethod;
use russh::keys::{Algorithm, EcdsaCurve, HashAlg};
use russh::{Preferred, cipher, compression, kex, mac};

/// Default reference file holding router → command list.
pub const DEFAULT_CONFIGS_FILE: &str = "routers_configs.txt";

/// Default reference file holding router → connection parameters.
pub const DEFAULT_VALUES_FILE: &str = "routers_values.txt";

/// SSH port used when a router entry does not set one.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Per-command timeout used when a router entry does not set one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Time allowed between TCP connect and the first prompt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle time after which the SSH layer drops the connection.
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Modern key exchange algorithms in order of preference.
pub const SECURE_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
    kex::DH_GEX_SHA256,
];

/// Key exchange order accepted by older IOS images as well.
pub const LEGACY_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
    kex::DH_GEX_SHA256,
    kex::DH_G14_SHA1,
    kex::DH_GEX_SHA1,
    kex::DH_G1_SHA1,
];

pub const SECURE_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
];

/// Adds CBC mode ciphers for devices that predate CTR support.
pub const LEGACY_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
    cipher::AES_256_CBC,
    cipher::AES_192_CBC,
    cipher::AES_128_CBC,
];

pub const SECURE_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512,
    mac::HMAC_SHA256,
];

pub const LEGACY_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512,
    mac::HMAC_SHA256,
    mac::HMAC_SHA1_ETM,
    mac::HMAC_SHA1,
];

pub const DEFAULT_COMPRESSION_ALGORITHMS: &[compression::Name] =
    &[compression::NONE, compression::ZLIB, compression::ZLIB_LEGACY];

pub const SECURE_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP521,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
];

/// Host key types including `ssh-rsa` (SHA-1) and DSA.
pub const LEGACY_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP521,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa { hash: None },
    Algorithm::Dsa,
];

/// SSH algorithm and host key policy applied to every session of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecurityProfile {
    /// Modern algorithms only; host keys checked against `~/.ssh/known_hosts`.
    #[default]
    Modern,
    /// Modern algorithms plus SHA-1 key exchange, `ssh-rsa` host keys and CBC
    /// ciphers. Host keys are not checked.
    Legacy,
}

impl SecurityProfile {
    /// Algorithm preference handed to the SSH layer.
    pub fn preferred(self) -> Preferred {
        let (kex, key, cipher, mac) = match self {
            SecurityProfile::Modern => (
                SECURE_KEX_ORDER,
                SECURE_KEY_TYPES,
                SECURE_CIPHERS,
                SECURE_MAC_ALGORITHMS,
            ),
            SecurityProfile::Legacy => (
                LEGACY_KEX_ORDER,
                LEGACY_KEY_TYPES,
                LEGACY_CIPHERS,
                LEGACY_MAC_ALGORITHMS,
            ),
        };
        Preferred {
            kex: Cow::Borrowed(kex),
            key: Cow::Borrowed(key),
            cipher: Cow::Borrowed(cipher),
            mac: Cow::Borrowed(mac),
            compression: Cow::Borrowed(DEFAULT_COMPRESSION_ALGORITHMS),
        }
    }

    pub fn server_check(self) -> ServerCheckMethod {
        match self {
            SecurityProfile::Modern => ServerCheckMethod::DefaultKnownHostsFile,
            SecurityProfile::Legacy => ServerCheckMethod::NoCheck,
        }
    }
}

/// Settings for one run over a router list.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// File mapping router → connection parameters.
    pub values_path: PathBuf,
    /// File mapping router → configuration lines.
    pub configs_path: PathBuf,
    /// Optional show command run after the configuration batch.
    pub verify_command: Option<String>,
    /// SSH algorithm and host key policy for every session of the run.
    pub security: SecurityProfile,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            values_path: PathBuf::from(DEFAULT_VALUES_FILE),
            configs_path: PathBuf::from(DEFAULT_CONFIGS_FILE),
            verify_command: None,
            security: SecurityProfile::Legacy,
        }
    }
}

impl RunConfig {
    /// Sets the verification command; blank input disables it.
    pub fn with_verify_command(mut self, command: impl Into<String>) -> Self {
        let command = command.into();
        let trimmed = command.trim();
        self.verify_command = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_run_config_uses_default_file_names() {
        let config = RunConfig::default();
        assert_eq!(config.values_path, PathBuf::from("routers_values.txt"));
        assert_eq!(config.configs_path, PathBuf::from("routers_configs.txt"));
        assert_eq!(config.verify_command, None);
        assert_eq!(config.security, SecurityProfile::Legacy);
    }

    #[test]
    fn blank_verify_command_is_disabled() {
        let config = RunConfig::default().with_verify_command("   ");
        assert_eq!(config.verify_command, None);

        let config = RunConfig::default().with_verify_command(" show ip ospf neighbor ");
        assert_eq!(
            config.verify_command.as_deref(),
            Some("show ip ospf neighbor")
        );
    }

    #[test]
    fn modern_profile_checks_host_keys_and_excludes_sha1_and_cbc() {
        let profile = SecurityProfile::default();
        assert_eq!(profile, SecurityProfile::Modern);
        assert!(matches!(
            profile.server_check(),
            ServerCheckMethod::DefaultKnownHostsFile
        ));

        let preferred = profile.preferred();
        assert!(!preferred.kex.contains(&kex::DH_G1_SHA1));
        assert!(!preferred.kex.contains(&kex::DH_G14_SHA1));
        assert!(!preferred.cipher.contains(&cipher::AES_128_CBC));
        assert!(!preferred.mac.contains(&mac::HMAC_SHA1));
    }

    #[test]
    fn legacy_profile_keeps_old_ios_algorithms() {
        let profile = SecurityProfile::Legacy;
        assert!(matches!(profile.server_check(), ServerCheckMethod::NoCheck));

        let preferred = profile.preferred();
        assert!(preferred.kex.contains(&kex::DH_G14_SHA1));
        assert!(preferred.cipher.contains(&cipher::AES_128_CBC));
        assert!(preferred.mac.contains(&mac::HMAC_SHA1));
    }

    #[test]
    fn legacy_tables_extend_secure_tables() {
        assert!(SECURE_KEX_ORDER.iter().all(|k| LEGACY_KEX_ORDER.contains(k)));
        assert!(SECURE_CIPHERS.iter().all(|c| LEGACY_CIPHERS.contains(c)));
        assert!(
            SECURE_MAC_ALGORITHMS
                .iter()
                .all(|m| LEGACY_MAC_ALGORITHMS.contains(m))
        );
    }
}
